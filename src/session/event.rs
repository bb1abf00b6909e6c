//! Event document.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque event body.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Something the user said.
    UserSpeech,
    /// Something the bot said.
    BotSpeech,
    /// System notice.
    System,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserSpeech => "user_speech",
            EventType::BotSpeech => "bot_speech",
            EventType::System => "system",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_speech" => Ok(EventType::UserSpeech),
            "bot_speech" => Ok(EventType::BotSpeech),
            "system" => Ok(EventType::System),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

/// Fields a caller supplies when appending an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_id: String,
    pub kind: EventType,
    pub payload: Payload,
    /// Defaults to server time when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewEvent {
    pub fn new(event_id: impl Into<String>, kind: EventType, payload: Payload) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
            payload,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A single immutable occurrence within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Materialize an event for `session_id`, stamping `now` if the caller gave no time.
    pub fn record(session_id: impl Into<String>, new: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            event_id: new.event_id,
            session_id: session_id.into(),
            kind: new.kind,
            payload: new.payload,
            timestamp: new.timestamp.unwrap_or(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_record_defaults_timestamp() {
        let now = Utc::now();
        let event = Event::record(
            "s1",
            NewEvent::new("e1", EventType::UserSpeech, Payload::new()),
            now,
        );
        assert_eq!(event.timestamp, now);
        assert_eq!(event.session_id, "s1");
    }

    #[test]
    fn test_record_keeps_caller_timestamp() {
        let given = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let event = Event::record(
            "s1",
            NewEvent::new("e1", EventType::System, Payload::new()).at(given),
            Utc::now(),
        );
        assert_eq!(event.timestamp, given);
    }

    #[test]
    fn test_type_field_on_the_wire() {
        let payload = json!({"text": "hi"}).as_object().cloned().unwrap();
        let event = Event::record(
            "s1",
            NewEvent::new("e1", EventType::BotSpeech, payload),
            Utc::now(),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "bot_speech");
        assert_eq!(value["eventId"], "e1");
        assert_eq!(value["payload"]["text"], "hi");
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<EventType>("\"shout\"").is_err());
        assert!("shout".parse::<EventType>().is_err());
        assert_eq!("user_speech".parse::<EventType>(), Ok(EventType::UserSpeech));
    }
}
