//! Concurrent duplicate requests resolve to exactly one stored document.

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::json;

use convo_tracker::{
    DocumentStore, EventLog, EventType, MemoryStore, NewEvent, NewSession, PageRequest,
    SessionRegistry, SqliteStore,
};

const CALLERS: usize = 32;

async fn race_session_creation(store: Arc<dyn DocumentStore>) {
    let registry = Arc::new(SessionRegistry::new(Arc::clone(&store)));

    let tasks = (0..CALLERS).map(|i| {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            registry
                .create_or_upsert(NewSession::new("shared").language(format!("lang-{i}")))
                .await
        })
    });

    let sessions: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let stored = store.find_session("shared").await.unwrap().unwrap();
    for session in &sessions {
        assert_eq!(session.session_id, stored.session_id);
        assert_eq!(session.started_at, stored.started_at);
        assert_eq!(session.language, stored.language);
    }
}

async fn race_event_insertion(store: Arc<dyn DocumentStore>) {
    SessionRegistry::new(Arc::clone(&store))
        .create_or_upsert(NewSession::new("s1"))
        .await
        .unwrap();
    let log = Arc::new(EventLog::new(Arc::clone(&store)));

    let tasks = (0..CALLERS).map(|i| {
        let log = Arc::clone(&log);
        tokio::spawn(async move {
            let payload = json!({ "caller": i }).as_object().cloned().unwrap();
            log.add("s1", NewEvent::new("e1", EventType::UserSpeech, payload))
                .await
        })
    });

    let events: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(store.count_events("s1").await.unwrap(), 1);
    let page = log.list("s1", PageRequest::default()).await.unwrap();
    let stored = &page.events[0];
    for event in &events {
        assert_eq!(event, stored);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_session_creation_memory() {
    let store = Arc::new(MemoryStore::new());
    race_session_creation(store.clone()).await;
    assert_eq!(store.session_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_session_creation_sqlite() {
    race_session_creation(Arc::new(SqliteStore::in_memory().unwrap())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_event_insertion_memory() {
    let store = Arc::new(MemoryStore::new());
    race_event_insertion(store.clone()).await;
    assert_eq!(store.event_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_event_insertion_sqlite() {
    race_event_insertion(Arc::new(SqliteStore::in_memory().unwrap())).await;
}
