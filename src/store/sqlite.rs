//! SQLite document store implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{DocumentStore, Insertion, StorageError, StorageResult, Window};
use crate::session::{Event, Metadata, Payload, Session};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        session_id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        language TEXT,
        metadata TEXT,
        started_at TEXT NOT NULL,
        ended_at TEXT
    );
    CREATE TABLE IF NOT EXISTS events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        event_id TEXT NOT NULL,
        type TEXT NOT NULL,
        payload TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        UNIQUE (session_id, event_id)
    );
    CREATE INDEX IF NOT EXISTS idx_events_session_time
        ON events(session_id, timestamp, seq);
"#;

const SESSION_COLUMNS: &str = "session_id, status, language, metadata, started_at, ended_at";
const EVENT_COLUMNS: &str = "event_id, session_id, type, payload, timestamp";

/// SQLite-backed document store.
///
/// Uniqueness is enforced by the schema: `sessions.session_id` is the
/// primary key and `events` carries `UNIQUE (session_id, event_id)`.
///
/// rusqlite is synchronous, so every statement runs on tokio's blocking
/// pool and the runtime workers never wait on the connection lock or disk.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StorageError::LockPoisoned)?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_session(&self, session: &Session) -> StorageResult<Insertion<Session>> {
        let session = session.clone();
        self.run(move |conn| insert_session(conn, session)).await
    }

    async fn find_session(&self, session_id: &str) -> StorageResult<Option<Session>> {
        let session_id = session_id.to_owned();
        self.run(move |conn| find_session(conn, &session_id)).await
    }

    async fn update_session(&self, session: &Session) -> StorageResult<bool> {
        let session = session.clone();
        self.run(move |conn| update_session(conn, &session)).await
    }

    async fn insert_event(&self, event: &Event) -> StorageResult<Insertion<Event>> {
        let event = event.clone();
        self.run(move |conn| insert_event(conn, event)).await
    }

    async fn find_event(&self, session_id: &str, event_id: &str) -> StorageResult<Option<Event>> {
        let session_id = session_id.to_owned();
        let event_id = event_id.to_owned();
        self.run(move |conn| find_event(conn, &session_id, &event_id))
            .await
    }

    async fn find_events(&self, session_id: &str, window: Window) -> StorageResult<Vec<Event>> {
        let session_id = session_id.to_owned();
        self.run(move |conn| find_events(conn, &session_id, window))
            .await
    }

    async fn count_events(&self, session_id: &str) -> StorageResult<u64> {
        let session_id = session_id.to_owned();
        self.run(move |conn| count_events(conn, &session_id)).await
    }
}

fn insert_session(conn: &Connection, session: Session) -> StorageResult<Insertion<Session>> {
    let metadata = session
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let result = conn.execute(
        "INSERT INTO sessions (session_id, status, language, metadata, started_at, ended_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            session.session_id,
            session.status.as_str(),
            session.language,
            metadata,
            encode_time(&session.started_at),
            session.ended_at.as_ref().map(encode_time),
        ],
    );

    match result {
        Ok(_) => Ok(Insertion::Inserted(session)),
        Err(e) if is_uniqueness_violation(&e) => Ok(Insertion::AlreadyExists),
        Err(e) => Err(e.into()),
    }
}

fn find_session(conn: &Connection, session_id: &str) -> StorageResult<Option<Session>> {
    let raw = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1"),
            [session_id],
            RawSession::from_row,
        )
        .optional()?;

    raw.map(RawSession::decode).transpose()
}

fn update_session(conn: &Connection, session: &Session) -> StorageResult<bool> {
    let metadata = session
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let changed = conn.execute(
        "UPDATE sessions
         SET status = ?2, language = ?3, metadata = ?4, started_at = ?5, ended_at = ?6
         WHERE session_id = ?1",
        params![
            session.session_id,
            session.status.as_str(),
            session.language,
            metadata,
            encode_time(&session.started_at),
            session.ended_at.as_ref().map(encode_time),
        ],
    )?;
    Ok(changed > 0)
}

fn insert_event(conn: &Connection, event: Event) -> StorageResult<Insertion<Event>> {
    let payload = serde_json::to_string(&event.payload)?;

    let result = conn.execute(
        "INSERT INTO events (event_id, session_id, type, payload, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.event_id,
            event.session_id,
            event.kind.as_str(),
            payload,
            encode_time(&event.timestamp),
        ],
    );

    match result {
        Ok(_) => Ok(Insertion::Inserted(event)),
        Err(e) if is_uniqueness_violation(&e) => Ok(Insertion::AlreadyExists),
        Err(e) => Err(e.into()),
    }
}

fn find_event(conn: &Connection, session_id: &str, event_id: &str) -> StorageResult<Option<Event>> {
    let raw = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE session_id = ?1 AND event_id = ?2"),
            [session_id, event_id],
            RawEvent::from_row,
        )
        .optional()?;

    raw.map(RawEvent::decode).transpose()
}

fn find_events(conn: &Connection, session_id: &str, window: Window) -> StorageResult<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE session_id = ?1
         ORDER BY timestamp, seq
         LIMIT ?2 OFFSET ?3"
    ))?;
    let raws = stmt
        .query_map(
            params![session_id, to_sql_int(window.limit), to_sql_int(window.skip)],
            RawEvent::from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    raws.into_iter().map(RawEvent::decode).collect()
}

fn count_events(conn: &Connection, session_id: &str) -> StorageResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE session_id = ?1",
        [session_id],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

/// True only for the primary-key and unique-index violations the schema
/// declares; other constraint failures are real faults.
fn is_uniqueness_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => matches!(
            code.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        ),
        _ => false,
    }
}

/// Fixed-width RFC 3339 so lexical order matches chronological order.
fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad timestamp '{value}': {e}")))
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

struct RawSession {
    session_id: String,
    status: String,
    language: Option<String>,
    metadata: Option<String>,
    started_at: String,
    ended_at: Option<String>,
}

impl RawSession {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            session_id: row.get(0)?,
            status: row.get(1)?,
            language: row.get(2)?,
            metadata: row.get(3)?,
            started_at: row.get(4)?,
            ended_at: row.get(5)?,
        })
    }

    fn decode(self) -> StorageResult<Session> {
        let metadata = self
            .metadata
            .as_deref()
            .map(serde_json::from_str::<Metadata>)
            .transpose()?;

        Ok(Session {
            status: self.status.parse().map_err(StorageError::Corrupt)?,
            language: self.language,
            metadata,
            started_at: decode_time(&self.started_at)?,
            ended_at: self.ended_at.as_deref().map(decode_time).transpose()?,
            session_id: self.session_id,
        })
    }
}

struct RawEvent {
    event_id: String,
    session_id: String,
    kind: String,
    payload: String,
    timestamp: String,
}

impl RawEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            event_id: row.get(0)?,
            session_id: row.get(1)?,
            kind: row.get(2)?,
            payload: row.get(3)?,
            timestamp: row.get(4)?,
        })
    }

    fn decode(self) -> StorageResult<Event> {
        Ok(Event {
            kind: self.kind.parse().map_err(StorageError::Corrupt)?,
            payload: serde_json::from_str::<Payload>(&self.payload)?,
            timestamp: decode_time(&self.timestamp)?,
            event_id: self.event_id,
            session_id: self.session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{EventType, NewEvent, NewSession, SessionStatus};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn event(session_id: &str, event_id: &str, offset_secs: i64) -> Event {
        let payload = json!({"text": event_id}).as_object().cloned().unwrap();
        Event::record(
            session_id,
            NewEvent::new(event_id, EventType::UserSpeech, payload)
                .at(base_time() + Duration::seconds(offset_secs)),
            base_time(),
        )
    }

    #[tokio::test]
    async fn test_session_roundtrip_preserves_fields() {
        let store = SqliteStore::in_memory().unwrap();
        let metadata = json!({"userId": "123", "tags": ["a", "b"]})
            .as_object()
            .cloned()
            .unwrap();
        let session = Session::initiate(
            NewSession::new("s1").language("en").metadata(metadata),
            Utc::now(),
        );

        store.insert_session(&session).await.unwrap();
        let loaded = store.find_session("s1").await.unwrap().unwrap();

        // Nanosecond encoding keeps timestamps exact.
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_primary_key_maps_to_already_exists() {
        let store = SqliteStore::in_memory().unwrap();
        let session = Session::initiate(NewSession::new("s1"), Utc::now());

        assert!(matches!(
            store.insert_session(&session).await.unwrap(),
            Insertion::Inserted(_)
        ));
        assert_eq!(
            store.insert_session(&session).await.unwrap(),
            Insertion::AlreadyExists
        );
    }

    #[tokio::test]
    async fn test_unique_event_key_maps_to_already_exists() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_event(&event("s1", "e1", 0)).await.unwrap();

        assert_eq!(
            store.insert_event(&event("s1", "e1", 5)).await.unwrap(),
            Insertion::AlreadyExists
        );
        assert!(matches!(
            store.insert_event(&event("s2", "e1", 0)).await.unwrap(),
            Insertion::Inserted(_)
        ));
        assert_eq!(store.count_events("s1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_session() {
        let store = SqliteStore::in_memory().unwrap();
        let mut session = Session::initiate(NewSession::new("s1"), Utc::now());
        store.insert_session(&session).await.unwrap();

        session.complete(Utc::now());
        assert!(store.update_session(&session).await.unwrap());

        let loaded = store.find_session("s1").await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Completed);
        assert_eq!(loaded.ended_at, session.ended_at);

        let ghost = Session::initiate(NewSession::new("ghost"), Utc::now());
        assert!(!store.update_session(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_events_ordered_and_paged() {
        let store = SqliteStore::in_memory().unwrap();
        for (id, offset) in [("e3", 3), ("e1", 1), ("e2", 2), ("e5", 5), ("e4", 4)] {
            store.insert_event(&event("s1", id, offset)).await.unwrap();
        }

        let first = store
            .find_events("s1", Window { skip: 0, limit: 2 })
            .await
            .unwrap();
        let ids: Vec<_> = first.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, ["e1", "e2"]);

        let last = store
            .find_events("s1", Window { skip: 4, limit: 2 })
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].event_id, "e5");
        assert_eq!(last[0].payload["text"], "e5");

        let beyond = store
            .find_events("s1", Window { skip: 6, limit: 2 })
            .await
            .unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_missing_documents() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.find_session("nope").await.unwrap().is_none());
        assert!(store.find_event("nope", "e1").await.unwrap().is_none());
        assert_eq!(store.count_events("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert_session(&Session::initiate(NewSession::new("s1"), Utc::now()))
                .await
                .unwrap();
            store.insert_event(&event("s1", "e1", 0)).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.find_session("s1").await.unwrap().is_some());
        assert_eq!(store.count_events("s1").await.unwrap(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_busy_connection_leaves_runtime_free() {
        use std::sync::mpsc;
        use std::time::{Duration as StdDuration, Instant};

        let store = SqliteStore::in_memory().unwrap();
        let conn = Arc::clone(&store.conn);
        let (locked_tx, locked_rx) = mpsc::channel();
        let holder = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(StdDuration::from_millis(200));
        });
        locked_rx.recv().unwrap();

        // The single runtime thread must keep polling this timer while the
        // store waits for the connection.
        let ticker = tokio::spawn(async {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
            Instant::now()
        });

        assert_eq!(store.count_events("s1").await.unwrap(), 0);
        let finished = Instant::now();
        let ticked = ticker.await.unwrap();

        assert!(ticked < finished);
        holder.join().unwrap();
    }

    #[tokio::test]
    async fn test_poisoned_connection_is_reported() {
        let store = SqliteStore::in_memory().unwrap();
        let conn = Arc::clone(&store.conn);
        let _ = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            panic!("poison the connection lock");
        })
        .join();

        assert!(matches!(
            store.find_session("s1").await,
            Err(StorageError::LockPoisoned)
        ));
    }

    #[test]
    fn test_encoded_times_sort_lexically() {
        let early = encode_time(&base_time());
        let later = encode_time(&(base_time() + Duration::milliseconds(1)));
        assert_eq!(early.len(), later.len());
        assert!(early < later);
    }
}
