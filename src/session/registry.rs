//! Session registry: idempotent creation and completion of sessions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::{NewSession, Session};
use crate::error::TrackerError;
use crate::store::{DocumentStore, Insertion, StorageError};
use crate::Result;

/// Owns session lifecycle on top of a [`DocumentStore`].
///
/// Holds no session state of its own; every call re-reads the store.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn DocumentStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a session, or return the one already stored under the same ID.
    ///
    /// The first write wins: `language` and `metadata` of later calls are
    /// ignored. A concurrent creator that loses the insert race gets the
    /// winner's document back.
    pub async fn create_or_upsert(&self, new: NewSession) -> Result<Session> {
        if let Some(existing) = self.store.find_session(&new.session_id).await? {
            debug!(session_id = %existing.session_id, "session already exists");
            return Ok(existing);
        }

        let session_id = new.session_id.clone();
        let session = Session::initiate(new, Utc::now());

        match self.store.insert_session(&session).await? {
            Insertion::Inserted(session) => {
                info!(session_id = %session.session_id, "session created");
                Ok(session)
            }
            Insertion::AlreadyExists => {
                debug!(session_id = %session_id, "lost session insert race, re-reading");
                self.store
                    .find_session(&session_id)
                    .await?
                    .ok_or_else(|| StorageError::MissingAfterConflict(session_id).into())
            }
        }
    }

    /// Load a session, failing with `SessionNotFound` if absent.
    pub async fn get(&self, session_id: &str) -> Result<Session> {
        self.store
            .find_session(session_id)
            .await?
            .ok_or_else(|| TrackerError::SessionNotFound(session_id.to_string()))
    }

    /// Mark a session completed.
    ///
    /// Completing an already completed session returns it untouched.
    /// Two racing completions both write; the later `ended_at` wins.
    pub async fn complete(&self, session_id: &str) -> Result<Session> {
        let mut session = self.get(session_id).await?;

        if session.is_completed() {
            debug!(session_id, "session already completed");
            return Ok(session);
        }
        session.complete(Utc::now());

        if !self.store.update_session(&session).await? {
            return Err(TrackerError::SessionNotFound(session_id.to_string()));
        }

        info!(session_id, "session completed");
        Ok(session)
    }
}
