//! REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::types::{AddEventRequest, CreateSessionRequest, ErrorResponse, PageQuery};
use crate::error::TrackerError;
use crate::session::{Event, EventLog, Session, SessionPage, SessionRegistry, DEFAULT_LIMIT};
use crate::store::{DocumentStore, MemoryStore};

/// Upper bound on `limit` when none is configured.
pub const DEFAULT_MAX_LIMIT: u64 = 500;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub events: Arc<EventLog>,
    pub default_limit: u64,
    pub max_limit: u64,
}

impl AppState {
    /// State backed by a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// State backed by the given store.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(Arc::clone(&store))),
            events: Arc::new(EventLog::new(store)),
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    /// Page size for requests without `limit`, and the largest allowed `limit`.
    pub fn with_page_limits(mut self, default_limit: u64, max_limit: u64) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn error_response(err: TrackerError) -> ApiError {
    if !err.is_client_error() {
        tracing::warn!(error = %err, "request failed");
    }

    match err {
        TrackerError::SessionNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::session_not_found(&id)),
        ),
        TrackerError::InvalidRequest(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(message)),
        ),
        err => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(
                ErrorResponse::internal_error("Request could not be completed")
                    .with_details(err.to_string()),
            ),
        ),
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "convo-tracker",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Create a session, or return the existing one with the same ID.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let new = req.into_new_session().map_err(error_response)?;
    let session = state
        .registry
        .create_or_upsert(new)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Append an event to a session.
pub async fn add_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<AddEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let new = req.into_new_event().map_err(error_response)?;
    let event = state
        .events
        .add(&session_id, new)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// Get a session with one page of its events.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<SessionPage>, ApiError> {
    let request = query
        .into_request(state.default_limit, state.max_limit)
        .map_err(error_response)?;
    let page = state
        .events
        .list(&session_id, request)
        .await
        .map_err(error_response)?;

    Ok(Json(page))
}

/// Mark a session completed.
pub async fn complete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .registry
        .complete(&session_id)
        .await
        .map_err(error_response)?;

    Ok(Json(session))
}
