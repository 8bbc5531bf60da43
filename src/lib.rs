//! # thread-events
//!
//! A cross-thread event marshaling and dispatch engine for applications
//! with a single designated "owner" thread, such as a UI message loop.
//!
//! ## Features
//!
//! - **Thread-safe** publish/subscribe with snapshot dispatch
//! - **Ticket-based marshaling** — only integers cross the thread
//!   boundary; payloads wait in a registry until redeemed
//! - **Two delivery modes**: fire-and-forget posting and blocking
//!   synchronous handoff with an in-place result
//! - **Decoupled fan-out** through a single-consumer async queue that
//!   isolates slow or panicking subscribers from producers
//!
//! ## Quick Example
//!
//! ```rust
//! use thread_events::{EventEngine, SubscribeRequest};
//! use serde_json::json;
//! use std::sync::mpsc;
//! use std::time::Duration;
//!
//! fn main() -> thread_events::Result<()> {
//!     // The engine owns the dispatcher, registry, queue, and the
//!     // reference owner-thread message loop.
//!     let engine = EventEngine::builder().build()?;
//!     let manager = engine.manager().clone();
//!
//!     // Subscribe with owner-thread affinity; the blocking send
//!     // returns once the subscription id is filled in.
//!     let (tx, rx) = mpsc::channel();
//!     let request = SubscribeRequest::new("alarm", move |event| {
//!         tx.send(event.payload["level"].as_i64()).unwrap();
//!     });
//!     let subscription_id = manager.subscribe_on_owner(&request)?;
//!
//!     // Fire an event from any thread.
//!     manager.trigger_event("alarm", "panel", json!({"level": 3}))?;
//!     assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Some(3));
//!
//!     manager.unsubscribe_on_owner("alarm", subscription_id)?;
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    unreachable_pub
)]

/// Core event value type
pub mod event;

/// Error types and result aliases
pub mod error;

/// Synchronous publish/subscribe dispatch
pub mod dispatcher;

/// Ticket registry for cross-thread payload handoff
pub mod registry;

/// Decoupled asynchronous fan-out queue
pub mod queue;

/// Owner-thread delivery interface and ticket routing
pub mod executor;

/// Engine façade and composition root
pub mod manager;

/// Sugar for wiring UI controls to handlers
pub mod mapper;

// Re-export commonly used types
pub use dispatcher::{EventDispatcher, EventHandler};
pub use error::{Error, Result};
pub use event::UiEvent;
pub use executor::{MessageLoop, OwnerExecutor, Ticket, TicketKind, TicketRouter};
pub use manager::{EngineConfig, EngineStats, EventEngine, EventEngineBuilder, EventManager};
pub use mapper::ControlMapper;
pub use queue::EventQueue;
pub use registry::{SubscribeRequest, TicketRegistry, UnsubscribeRequest, NO_SUBSCRIPTION};

/// Prelude module for convenient imports
///
/// # Example
/// ```rust
/// use thread_events::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::event::UiEvent;
    pub use crate::executor::{OwnerExecutor, Ticket, TicketKind};
    pub use crate::manager::{EngineConfig, EventEngine, EventManager};
    pub use crate::registry::SubscribeRequest;
}
