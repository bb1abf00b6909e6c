//! Document store abstraction.
//!
//! Session and event documents live behind the [`DocumentStore`] trait so
//! the registry and event log never hold authoritative state themselves.
//! Two backends are provided:
//!
//! - [`MemoryStore`] - process-local maps, for tests and ephemeral runs
//! - [`SqliteStore`] - durable SQLite file
//!
//! # Uniqueness
//!
//! Each backend enforces one document per `session_id` and one event per
//! `(session_id, event_id)`. A rejected insert is reported as
//! [`Insertion::AlreadyExists`], never as an error, so callers branch on the
//! outcome instead of inspecting failures.

mod error;
mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::session::{Event, Session};

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Outcome of a unique-constrained insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Insertion<T> {
    /// The document was written.
    Inserted(T),
    /// A document with the same key is already stored.
    AlreadyExists,
}

/// Skip/limit window over a sorted result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: u64,
}

/// Storage interface for session and event documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a session, unique on `session_id`.
    async fn insert_session(&self, session: &Session) -> StorageResult<Insertion<Session>>;

    /// Load a session by ID.
    ///
    /// Returns `Ok(None)` if the session doesn't exist.
    async fn find_session(&self, session_id: &str) -> StorageResult<Option<Session>>;

    /// Replace the session matching `session.session_id`.
    ///
    /// Returns `Ok(false)` if no session matched.
    async fn update_session(&self, session: &Session) -> StorageResult<bool>;

    /// Insert an event, unique on `(session_id, event_id)`.
    async fn insert_event(&self, event: &Event) -> StorageResult<Insertion<Event>>;

    /// Load a single event by its composite key.
    async fn find_event(&self, session_id: &str, event_id: &str) -> StorageResult<Option<Event>>;

    /// Events of a session ordered by ascending timestamp, ties in insertion
    /// order, restricted to `window`.
    async fn find_events(&self, session_id: &str, window: Window) -> StorageResult<Vec<Event>>;

    /// Number of events stored for a session.
    async fn count_events(&self, session_id: &str) -> StorageResult<u64>;
}
