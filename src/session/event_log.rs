//! Per-session append-only event log.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::{Event, NewEvent, PageRequest, Pagination, SessionPage};
use crate::error::TrackerError;
use crate::store::{DocumentStore, Insertion, StorageError};
use crate::Result;

/// Appends and pages through session events stored in a [`DocumentStore`].
#[derive(Clone)]
pub struct EventLog {
    store: Arc<dyn DocumentStore>,
}

impl EventLog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Append an event to an existing session.
    ///
    /// A repeated `(session_id, event_id)` returns the stored event; the
    /// new type, payload and timestamp are discarded without comparison.
    pub async fn add(&self, session_id: &str, new: NewEvent) -> Result<Event> {
        if self.store.find_session(session_id).await?.is_none() {
            return Err(TrackerError::SessionNotFound(session_id.to_string()));
        }

        if let Some(existing) = self.store.find_event(session_id, &new.event_id).await? {
            debug!(session_id, event_id = %existing.event_id, "event already recorded");
            return Ok(existing);
        }

        let event = Event::record(session_id, new, Utc::now());

        match self.store.insert_event(&event).await? {
            Insertion::Inserted(event) => {
                debug!(session_id, event_id = %event.event_id, kind = %event.kind, "event recorded");
                Ok(event)
            }
            Insertion::AlreadyExists => {
                debug!(session_id, event_id = %event.event_id, "lost event insert race, re-reading");
                self.store
                    .find_event(session_id, &event.event_id)
                    .await?
                    .ok_or_else(|| {
                        StorageError::MissingAfterConflict(format!(
                            "{}/{}",
                            session_id, event.event_id
                        ))
                        .into()
                    })
            }
        }
    }

    /// Session snapshot with one page of its events in timestamp order.
    ///
    /// Pages past the end come back empty with the real totals.
    pub async fn list(&self, session_id: &str, request: PageRequest) -> Result<SessionPage> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or_else(|| TrackerError::SessionNotFound(session_id.to_string()))?;

        let events = self.store.find_events(session_id, request.window()).await?;
        let total = self.store.count_events(session_id).await?;

        Ok(SessionPage {
            session,
            events,
            pagination: Pagination::new(request, total),
        })
    }
}
