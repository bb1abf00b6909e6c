//! # convo-tracker
//!
//! Conversation-session tracker with an idempotent REST API.
//!
//! Clients open a session (a voice or chat interaction), append timestamped
//! events to it, page through the event history, and mark the session
//! complete. Repeated or concurrent requests for the same session or event
//! always resolve to a single stored document.
//!
//! ## Features
//!
//! - **Idempotent creation**: first write wins for sessions and events
//! - **Race-safe**: uniqueness is delegated to the document store; a lost
//!   insert race returns the winner's document
//! - **Paged history**: events ordered by timestamp with page/limit metadata
//! - **Pluggable storage**: in-memory or SQLite behind [`DocumentStore`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use convo_tracker::{EventLog, EventType, MemoryStore, NewEvent, NewSession, PageRequest, SessionRegistry};
//!
//! #[tokio::main]
//! async fn main() -> convo_tracker::Result<()> {
//!     convo_tracker::logging::try_init().ok();
//!
//!     let store = Arc::new(MemoryStore::new());
//!     let registry = SessionRegistry::new(store.clone());
//!     let events = EventLog::new(store);
//!
//!     registry.create_or_upsert(NewSession::new("s1").language("en")).await?;
//!
//!     let mut payload = convo_tracker::Payload::new();
//!     payload.insert("text".into(), "hi".into());
//!     events.add("s1", NewEvent::new("e1", EventType::UserSpeech, payload)).await?;
//!
//!     let page = events.list("s1", PageRequest::default()).await?;
//!     println!("{} event(s)", page.pagination.total);
//!
//!     registry.complete("s1").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use error::{Result, TrackerError};
pub use session::{
    Event, EventLog, EventType, Metadata, NewEvent, NewSession, PageRequest, Pagination, Payload,
    Session, SessionPage, SessionRegistry, SessionStatus,
};
pub use store::{DocumentStore, Insertion, MemoryStore, SqliteStore, StorageError};
