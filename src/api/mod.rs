//! API layer for convo-tracker.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check
//! - `GET /` - API information
//!
//! ### Sessions
//! - `POST /sessions` - Create a session (idempotent on `sessionId`)
//! - `GET /sessions/{id}?page=&limit=` - Session with a page of events
//! - `POST /sessions/{id}/events` - Append an event (idempotent on `eventId`)
//! - `POST /sessions/{id}/complete` - Mark the session completed
//!
//! ## Example
//!
//! ```no_run
//! use convo_tracker::api::{ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> convo_tracker::Result<()> {
//!     let config = ServerConfig::new("127.0.0.1", 3000);
//!     serve(config).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use handlers::{AppState, DEFAULT_MAX_LIMIT};
pub use router::{create_router, create_router_with_state, serve, serve_with_state, ServerConfig};
pub use types::{AddEventRequest, CreateSessionRequest, ErrorResponse, PageQuery};
