//! Conversation session management.
//!
//! This module holds the session and event documents, the session status
//! machine, and the two components that operate on them: the
//! [`SessionRegistry`] (session lifecycle) and the [`EventLog`] (append and
//! page through events).

mod event;
mod event_log;
mod model;
mod page;
mod registry;
mod state;

pub use event::{Event, EventType, NewEvent, Payload};
pub use event_log::EventLog;
pub use model::{Metadata, NewSession, Session};
pub use page::{PageRequest, Pagination, SessionPage, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use registry::SessionRegistry;
pub use state::SessionStatus;
