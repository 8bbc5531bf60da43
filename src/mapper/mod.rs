//! Sugar for wiring UI controls to plain functions.
//!
//! Front-end controls emit events typed by convention: a button with id
//! `start` emits `button-start`, a slider with id `temperature` emits
//! `slider-temperature` carrying `{"value": ...}`. The mapper hides the
//! naming convention and the payload parsing behind `map_button` and
//! `map_slider`.

use crate::manager::EventManager;
use serde_json::Value;
use tracing::{error, warn};

/// Maps UI control identifiers onto subscriptions.
#[derive(Debug, Clone)]
pub struct ControlMapper {
    manager: EventManager,
}

impl ControlMapper {
    /// Create a mapper over an engine's manager.
    pub fn new(manager: EventManager) -> Self {
        Self { manager }
    }

    /// Subscribe a no-argument function to a button's events and return
    /// the subscription id.
    pub fn map_button<F>(&self, button_id: &str, f: F) -> i64
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.manager
            .subscribe(format!("button-{button_id}"), move |_| f())
    }

    /// Subscribe a value-taking function to a slider's events and return
    /// the subscription id.
    ///
    /// The slider's position is read from the payload's `"value"` field;
    /// unreadable payloads yield `0.0` and a warning.
    pub fn map_slider<F>(&self, slider_id: &str, f: F) -> i64
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let id = slider_id.to_owned();
        self.manager
            .subscribe(format!("slider-{slider_id}"), move |event| {
                f(extract_slider_value(&event.payload, &id));
            })
    }
}

/// Extract the numeric `"value"` field of a slider payload.
///
/// Accepts a JSON number or a numeric string; anything else yields `0.0`
/// with a log line naming the slider.
pub fn extract_slider_value(payload: &Value, slider_id: &str) -> f64 {
    if payload.is_null() {
        warn!(slider = slider_id, "empty payload for slider");
        return 0.0;
    }

    match payload.get("value") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => match s.parse() {
            Ok(value) => value,
            Err(_) => {
                error!(
                    slider = slider_id,
                    "cannot convert string value to number for slider"
                );
                0.0
            }
        },
        _ => {
            warn!(slider = slider_id, "missing or invalid 'value' field for slider");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{EngineConfig, EventEngine};
    use serde_json::json;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_extract_slider_value_from_number() {
        assert_eq!(extract_slider_value(&json!({"value": 36.5}), "temp"), 36.5);
        assert_eq!(extract_slider_value(&json!({"value": 4}), "temp"), 4.0);
    }

    #[test]
    fn test_extract_slider_value_from_numeric_string() {
        assert_eq!(extract_slider_value(&json!({"value": "2.25"}), "temp"), 2.25);
    }

    #[test]
    fn test_extract_slider_value_fallbacks() {
        assert_eq!(extract_slider_value(&json!(null), "temp"), 0.0);
        assert_eq!(extract_slider_value(&json!({}), "temp"), 0.0);
        assert_eq!(extract_slider_value(&json!({"value": "hot"}), "temp"), 0.0);
        assert_eq!(extract_slider_value(&json!({"value": [1]}), "temp"), 0.0);
    }

    #[test]
    fn test_mapped_controls_receive_their_events() {
        let engine = EventEngine::builder()
            .config(EngineConfig::test())
            .build()
            .unwrap();
        let mapper = ControlMapper::new(engine.manager().clone());

        let (button_tx, button_rx) = mpsc::channel();
        mapper.map_button("start", move || button_tx.send(()).unwrap());

        let (slider_tx, slider_rx) = mpsc::channel();
        mapper.map_slider("temperature", move |value| slider_tx.send(value).unwrap());

        let manager = engine.manager();
        manager
            .trigger_event("button-start", "toolbar", json!({}))
            .unwrap();
        manager
            .trigger_event("slider-temperature", "settings", json!({"value": 36.5}))
            .unwrap();

        button_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let value = slider_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(value, 36.5);
        engine.shutdown();
    }
}
