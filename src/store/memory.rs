//! In-process document store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{DocumentStore, Insertion, StorageError, StorageResult, Window};
use crate::session::{Event, Session};

/// Thread-safe in-memory storage for sessions and events.
///
/// Uniqueness is checked and the document written under a single write
/// lock, so concurrent inserts of the same key leave exactly one document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
    events: RwLock<HashMap<String, SessionEvents>>,
}

/// One session's events in insertion order, indexed by event id.
#[derive(Debug, Default)]
struct SessionEvents {
    ordered: Vec<Event>,
    by_id: HashMap<String, usize>,
}

impl SessionEvents {
    fn get(&self, event_id: &str) -> Option<&Event> {
        self.by_id.get(event_id).map(|&i| &self.ordered[i])
    }

    /// Returns `false` if the id is already taken.
    fn push(&mut self, event: Event) -> bool {
        if self.by_id.contains_key(&event.event_id) {
            return false;
        }
        self.by_id.insert(event.event_id.clone(), self.ordered.len());
        self.ordered.push(event);
        true
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session documents held.
    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Number of event documents held across all sessions.
    pub fn event_count(&self) -> usize {
        self.events
            .read()
            .map(|e| e.values().map(SessionEvents::len).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_session(&self, session: &Session) -> StorageResult<Insertion<Session>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;

        if sessions.contains_key(&session.session_id) {
            return Ok(Insertion::AlreadyExists);
        }
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(Insertion::Inserted(session.clone()))
    }

    async fn find_session(&self, session_id: &str) -> StorageResult<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn update_session(&self, session: &Session) -> StorageResult<bool> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;

        match sessions.get_mut(&session.session_id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_event(&self, event: &Event) -> StorageResult<Insertion<Event>> {
        let mut events = self
            .events
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;

        let log = events.entry(event.session_id.clone()).or_default();
        if !log.push(event.clone()) {
            return Ok(Insertion::AlreadyExists);
        }
        Ok(Insertion::Inserted(event.clone()))
    }

    async fn find_event(&self, session_id: &str, event_id: &str) -> StorageResult<Option<Event>> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events
            .get(session_id)
            .and_then(|log| log.get(event_id))
            .cloned())
    }

    async fn find_events(&self, session_id: &str, window: Window) -> StorageResult<Vec<Event>> {
        let mut page = {
            let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
            events
                .get(session_id)
                .map(|log| log.ordered.clone())
                .unwrap_or_default()
        };

        // Stable sort keeps insertion order among equal timestamps.
        page.sort_by_key(|e| e.timestamp);

        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        Ok(page.into_iter().skip(skip).take(limit).collect())
    }

    async fn count_events(&self, session_id: &str) -> StorageResult<u64> {
        let events = self.events.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(events.get(session_id).map_or(0, |log| log.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{EventType, NewEvent, NewSession, Payload};
    use chrono::{Duration, Utc};

    fn session(id: &str) -> Session {
        Session::initiate(NewSession::new(id), Utc::now())
    }

    fn event(session_id: &str, event_id: &str, offset_secs: i64) -> Event {
        let base = Utc::now();
        Event::record(
            session_id,
            NewEvent::new(event_id, EventType::UserSpeech, Payload::new())
                .at(base + Duration::seconds(offset_secs)),
            base,
        )
    }

    #[tokio::test]
    async fn test_insert_and_find_session() {
        let store = MemoryStore::new();
        let s = session("s1");

        assert_eq!(
            store.insert_session(&s).await.unwrap(),
            Insertion::Inserted(s.clone())
        );
        assert_eq!(store.find_session("s1").await.unwrap(), Some(s));
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_session_reported() {
        let store = MemoryStore::new();
        store.insert_session(&session("s1")).await.unwrap();

        let second = store.insert_session(&session("s1")).await.unwrap();
        assert_eq!(second, Insertion::AlreadyExists);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_find_nonexistent() {
        let store = MemoryStore::new();
        assert!(store.find_session("missing").await.unwrap().is_none());
        assert!(store.find_event("missing", "e1").await.unwrap().is_none());
        assert_eq!(store.count_events("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_session() {
        let store = MemoryStore::new();
        let mut s = session("s1");
        store.insert_session(&s).await.unwrap();

        s.complete(Utc::now());
        assert!(store.update_session(&s).await.unwrap());
        assert!(store.find_session("s1").await.unwrap().unwrap().is_completed());

        assert!(!store.update_session(&session("other")).await.unwrap());
    }

    #[tokio::test]
    async fn test_event_key_is_per_session() {
        let store = MemoryStore::new();
        store.insert_event(&event("s1", "e1", 0)).await.unwrap();

        let dup = store.insert_event(&event("s1", "e1", 1)).await.unwrap();
        assert_eq!(dup, Insertion::AlreadyExists);

        let other = store.insert_event(&event("s2", "e1", 0)).await.unwrap();
        assert!(matches!(other, Insertion::Inserted(_)));
        assert_eq!(store.event_count(), 2);
    }

    #[tokio::test]
    async fn test_large_log_keeps_ids_unique_and_findable() {
        let store = MemoryStore::new();
        for i in 0..2_000 {
            let id = format!("e{i}");
            let inserted = store.insert_event(&event("s1", &id, i)).await.unwrap();
            assert!(matches!(inserted, Insertion::Inserted(_)));
        }

        for i in [0, 999, 1_999] {
            let id = format!("e{i}");
            assert_eq!(
                store.insert_event(&event("s1", &id, 0)).await.unwrap(),
                Insertion::AlreadyExists
            );
            let found = store.find_event("s1", &id).await.unwrap().unwrap();
            assert_eq!(found.event_id, id);
        }

        assert!(store.find_event("s1", "e2000").await.unwrap().is_none());
        assert_eq!(store.count_events("s1").await.unwrap(), 2_000);
        assert_eq!(store.event_count(), 2_000);
    }

    #[tokio::test]
    async fn test_find_events_sorted_and_windowed() {
        let store = MemoryStore::new();
        store.insert_event(&event("s1", "c", 30)).await.unwrap();
        store.insert_event(&event("s1", "a", 10)).await.unwrap();
        store.insert_event(&event("s1", "b", 20)).await.unwrap();

        let all = store
            .find_events("s1", Window { skip: 0, limit: 10 })
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let tail = store
            .find_events("s1", Window { skip: 2, limit: 10 })
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].event_id, "c");
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_insertion_order() {
        let store = MemoryStore::new();
        let at = Utc::now();
        for id in ["x", "y", "z"] {
            let e = Event::record(
                "s1",
                NewEvent::new(id, EventType::System, Payload::new()).at(at),
                at,
            );
            store.insert_event(&e).await.unwrap();
        }

        let events = store
            .find_events("s1", Window { skip: 0, limit: 10 })
            .await
            .unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, ["x", "y", "z"]);
    }
}
