//! Core event value type.
//!
//! A [`UiEvent`] is the fundamental unit of communication in the engine:
//! a type tag, the identifier of the UI element it concerns, a JSON
//! payload, and a creation timestamp. Events are immutable after
//! construction and move by value into the ticket registry or the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event flowing through the engine.
///
/// Events are cheap to clone and are never shared for concurrent
/// mutation; every hop across a thread boundary transfers ownership.
///
/// # Example
///
/// ```rust
/// use thread_events::UiEvent;
/// use serde_json::json;
///
/// let event = UiEvent::new("slider-temperature", "settings-panel", json!({"value": 36.5}));
/// assert_eq!(event.event_type, "slider-temperature");
/// assert_eq!(event.payload["value"], 36.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiEvent {
    /// Event type identifier, e.g. `"button-start"`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Identifier of the UI element the event concerns.
    pub target: String,

    /// Event data as a JSON document.
    pub payload: Value,

    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl UiEvent {
    /// Create a new event stamped with the current time.
    pub fn new(event_type: impl Into<String>, target: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            target: target.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create a new event with an explicit timestamp.
    pub fn with_timestamp(
        event_type: impl Into<String>,
        target: impl Into<String>,
        payload: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            target: target.into(),
            payload,
            timestamp,
        }
    }

    /// Serialize this event to a JSON string.
    ///
    /// The host forwards events to its web front end in this form.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Deserialize an event from a JSON string.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}
