//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::session::{
    EventType, Metadata, NewEvent, NewSession, PageRequest, Payload, DEFAULT_PAGE,
};

/// Request to create (or fetch) a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Externally supplied session identifier.
    pub session_id: String,
    /// Optional language tag.
    #[serde(default)]
    pub language: Option<String>,
    /// Optional metadata object.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl CreateSessionRequest {
    /// Validate and convert into the registry's input.
    pub fn into_new_session(self) -> Result<NewSession, TrackerError> {
        require_id("sessionId", &self.session_id)?;
        Ok(NewSession {
            session_id: self.session_id,
            language: self.language,
            metadata: self.metadata,
        })
    }
}

/// Request to append an event to a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEventRequest {
    pub event_id: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub payload: Payload,
    /// RFC 3339; server time when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl AddEventRequest {
    pub fn into_new_event(self) -> Result<NewEvent, TrackerError> {
        require_id("eventId", &self.event_id)?;
        Ok(NewEvent {
            event_id: self.event_id,
            kind: self.kind,
            payload: self.payload,
            timestamp: self.timestamp,
        })
    }
}

/// Query string for `GET /sessions/{id}`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl PageQuery {
    /// Apply defaults and bounds.
    ///
    /// A missing `limit` becomes `default_limit`; an explicit one must lie in
    /// `1..=max_limit`.
    pub fn into_request(
        self,
        default_limit: u64,
        max_limit: u64,
    ) -> Result<PageRequest, TrackerError> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(default_limit);

        if page == 0 {
            return Err(TrackerError::InvalidRequest("page must be at least 1".into()));
        }
        if limit == 0 || limit > max_limit {
            return Err(TrackerError::InvalidRequest(format!(
                "limit must be between 1 and {max_limit}"
            )));
        }
        Ok(PageRequest::new(page, limit))
    }
}

fn require_id(field: &str, value: &str) -> Result<(), TrackerError> {
    if value.trim().is_empty() {
        return Err(TrackerError::InvalidRequest(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "SESSION_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn session_not_found(id: &str) -> Self {
        Self::new("SESSION_NOT_FOUND", format!("Session '{}' not found", id))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }
}
