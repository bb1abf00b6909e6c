//! Session status state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session has been opened but no transition has happened yet.
    #[default]
    Initiated,
    /// Session is in progress.
    Active,
    /// Session has ended normally.
    Completed,
    /// Session ended abnormally.
    Failed,
}

impl SessionStatus {
    /// Check if transition to target status is valid.
    ///
    /// Valid transitions:
    /// - Initiated -> Active
    /// - Initiated | Active -> Failed
    /// - Initiated | Active | Failed -> Completed
    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (*self, target),
            (Initiated, Active)
                | (Initiated, Failed)
                | (Active, Failed)
                | (Initiated, Completed)
                | (Active, Completed)
                | (Failed, Completed)
        )
    }

    /// Attempt to transition to a new status.
    ///
    /// Returns `true` if the status changed.
    pub fn transition_to(&mut self, target: SessionStatus) -> bool {
        if self.can_transition_to(target) {
            *self = target;
            true
        } else {
            false
        }
    }

    /// Check if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed)
    }

    /// Wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initiated => "initiated",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(SessionStatus::Initiated),
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}
