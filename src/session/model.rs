//! Session document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionStatus;

/// Open-ended key/value map attached to a session.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Fields a caller supplies when opening a session.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    /// Externally supplied identity key.
    pub session_id: String,
    /// Optional language tag (e.g. "en").
    pub language: Option<String>,
    /// Optional caller metadata.
    pub metadata: Option<Metadata>,
}

impl NewSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A conversation session as stored in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Externally supplied, globally unique identifier.
    pub session_id: String,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Language tag, fixed at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Caller metadata, fixed at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Creation time.
    pub started_at: DateTime<Utc>,
    /// Completion time, set once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a freshly initiated session from a creation request.
    pub fn initiate(new: NewSession, now: DateTime<Utc>) -> Self {
        Self {
            session_id: new.session_id,
            status: SessionStatus::Initiated,
            language: new.language,
            metadata: new.metadata,
            started_at: now,
            ended_at: None,
        }
    }

    /// Mark the session completed.
    ///
    /// Returns `false` without touching `ended_at` if it was already completed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.transition_to(SessionStatus::Completed) {
            return false;
        }
        self.ended_at = Some(now);
        true
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }
}
