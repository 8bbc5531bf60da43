//! Engine façade and composition root.
//!
//! [`EventManager`] exposes the two marshaling modes to arbitrary
//! calling threads: fire-and-forget posting for events and blocking
//! sends for subscribe/unsubscribe operations that need owner-thread
//! affinity. [`EventEngine`] wires the dispatcher, ticket registry,
//! queue, and executor together and owns their lifetimes; there are no
//! process-global instances.

use crate::dispatcher::EventDispatcher;
use crate::error::{Error, Result};
use crate::executor::{MessageLoop, OwnerExecutor, Ticket, TicketKind};
use crate::queue::EventQueue;
use crate::registry::{SubscribeRequest, TicketRegistry};
use crate::UiEvent;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub mod builder;
pub mod config;

pub use builder::EventEngineBuilder;
pub use config::EngineConfig;

/// Cheap-to-clone façade over the engine for use from any thread.
#[derive(Clone)]
pub struct EventManager {
    dispatcher: Arc<EventDispatcher>,
    registry: Arc<TicketRegistry>,
    executor: Arc<dyn OwnerExecutor>,
}

impl EventManager {
    pub(crate) fn new(
        dispatcher: Arc<EventDispatcher>,
        registry: Arc<TicketRegistry>,
        executor: Arc<dyn OwnerExecutor>,
    ) -> Self {
        Self {
            dispatcher,
            registry,
            executor,
        }
    }

    /// Subscribe a handler directly, without owner-thread marshaling.
    ///
    /// The dispatcher is internally thread-safe, so this fast path is
    /// callable from any thread; only delivery timing depends on where
    /// dispatch later runs.
    pub fn subscribe<F>(&self, event_type: impl Into<String>, handler: F) -> i64
    where
        F: Fn(&UiEvent) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(event_type, handler)
    }

    /// Remove a subscription directly, returning whether a match was
    /// found.
    pub fn unsubscribe(&self, event_type: &str, subscription_id: i64) -> bool {
        self.dispatcher.unsubscribe(event_type, subscription_id)
    }

    /// Construct an event and post it toward the async queue.
    ///
    /// Asynchronous marshaling mode: the event is parked in the ticket
    /// registry and its ticket posted to the owner thread, which feeds
    /// the queue. The caller does not block and does not learn the
    /// delivery outcome.
    pub fn trigger_event(
        &self,
        event_type: impl Into<String>,
        target: impl Into<String>,
        payload: Value,
    ) -> Result<()> {
        let event = UiEvent::new(event_type, target, payload);
        debug!(event_type = %event.event_type, "triggering event");
        let ticket_id = self.registry.register_event(event);
        self.executor.post(Ticket::new(TicketKind::Event, ticket_id))
    }

    /// Subscribe with owner-thread affinity, blocking until done.
    ///
    /// Synchronous marshaling mode: the caller-owned request is parked
    /// in the registry and its ticket delivered with a blocking send.
    /// When this returns, the owner thread has performed the subscribe
    /// and written the id into `request`, which this method also
    /// returns. Never call this from the owner thread's own blocking
    /// context waiting on the caller.
    pub fn subscribe_on_owner(&self, request: &Arc<SubscribeRequest>) -> Result<i64> {
        let ticket_id = self.registry.register_subscribe_request(request);
        self.executor
            .send(Ticket::new(TicketKind::Subscribe, ticket_id))?;
        request
            .subscription_id()
            .ok_or_else(|| Error::SubscribeFailed {
                event_type: request.event_type().to_owned(),
            })
    }

    /// Unsubscribe with owner-thread affinity, blocking until done.
    ///
    /// An unknown subscription is logged on the owner thread and is not
    /// an error here, matching the direct path's no-op semantics.
    pub fn unsubscribe_on_owner(
        &self,
        event_type: impl Into<String>,
        subscription_id: i64,
    ) -> Result<()> {
        let ticket_id = self
            .registry
            .register_unsubscribe_request(event_type, subscription_id);
        self.executor
            .send(Ticket::new(TicketKind::Unsubscribe, ticket_id))
    }

    /// Subscribe with owner-thread affinity without blocking.
    ///
    /// The handler is parked as a callback ticket and posted. The
    /// returned callback id keys the result: once the owner thread has
    /// serviced the ticket, [`Self::poll_subscription_result`] yields
    /// the subscription id exactly once.
    pub fn subscribe_deferred<F>(&self, event_type: impl Into<String>, handler: F) -> Result<i64>
    where
        F: Fn(&UiEvent) + Send + Sync + 'static,
    {
        let callback_id = self
            .registry
            .register_callback(event_type, Arc::new(handler));
        self.executor
            .post(Ticket::new(TicketKind::Callback, callback_id))?;
        Ok(callback_id)
    }

    /// Poll for the subscription id of a deferred subscribe.
    ///
    /// Returns `None` while the callback ticket has not been serviced,
    /// and again after the result has been taken once.
    pub fn poll_subscription_result(&self, callback_id: i64) -> Option<i64> {
        self.registry.take_subscription_result(callback_id)
    }

    /// Whether the calling thread is the engine's owner thread.
    pub fn is_owner_thread(&self) -> bool {
        self.executor.is_owner_thread()
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("dispatcher", &self.dispatcher)
            .field("registry", &self.registry)
            .finish()
    }
}

/// The assembled engine, owned by the application's composition root.
///
/// # Example
///
/// ```rust
/// use thread_events::EventEngine;
/// use serde_json::json;
/// use std::sync::mpsc;
/// use std::time::Duration;
///
/// # fn main() -> thread_events::Result<()> {
/// let engine = EventEngine::builder().build()?;
/// let manager = engine.manager().clone();
///
/// let (tx, rx) = mpsc::channel();
/// manager.subscribe("button-start", move |event| {
///     tx.send(event.target.clone()).unwrap();
/// });
///
/// manager.trigger_event("button-start", "toolbar", json!({}))?;
/// assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "toolbar");
///
/// engine.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct EventEngine {
    pub(crate) dispatcher: Arc<EventDispatcher>,
    pub(crate) registry: Arc<TicketRegistry>,
    pub(crate) queue: Arc<EventQueue>,
    pub(crate) manager: EventManager,
    pub(crate) message_loop: Option<Arc<MessageLoop>>,
}

impl EventEngine {
    /// Create a new engine builder
    pub fn builder() -> EventEngineBuilder {
        EventEngineBuilder::new()
    }

    /// The façade for triggering and subscribing from any thread.
    pub fn manager(&self) -> &EventManager {
        &self.manager
    }

    /// Start the async queue's consumer thread.
    ///
    /// Only needed when the engine was built with the config's
    /// `start_consumer` flag disabled; a second start fails with
    /// [`Error::ConsumerAlreadyRunning`].
    pub fn start_processing(&self) -> Result<()> {
        self.queue.start_processing(self.dispatcher.clone())
    }

    /// Signal the async queue's consumer to stop. Idempotent.
    pub fn stop_processing(&self) {
        self.queue.stop_processing();
    }

    /// Whether the async queue's consumer is running.
    pub fn is_processing(&self) -> bool {
        self.queue.is_running()
    }

    /// Get statistics about the engine
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            subscriptions: self.dispatcher.total_subscriptions(),
            queued_events: self.queue.len(),
            pending_tickets: self.registry.pending_count(),
        }
    }

    /// Shut down the engine: stop the consumer, then stop and join the
    /// owned message loop, if any. Dropping the engine joins the
    /// consumer thread.
    pub fn shutdown(self) {
        info!("shutting down event engine");
        self.queue.stop_processing();
        if let Some(message_loop) = &self.message_loop {
            message_loop.shutdown();
        }
    }
}

impl fmt::Debug for EventEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEngine")
            .field("dispatcher", &self.dispatcher)
            .field("registry", &self.registry)
            .field("queue", &self.queue)
            .finish()
    }
}

/// Statistics about the engine
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Total number of subscriptions in the dispatcher.
    pub subscriptions: usize,

    /// Events waiting in the async queue.
    pub queued_events: usize,

    /// Payloads parked in the ticket registry.
    pub pending_tickets: usize,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subscriptions, {} queued events, {} pending tickets",
            self.subscriptions, self.queued_events, self.pending_tickets
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc;
    use std::time::Duration;

    fn engine() -> EventEngine {
        EventEngine::builder()
            .config(EngineConfig::test())
            .build()
            .unwrap()
    }

    #[test]
    fn test_trigger_event_reaches_direct_subscriber() {
        let engine = engine();
        let (tx, rx) = mpsc::channel();

        engine.manager().subscribe("alarm", move |event| {
            tx.send(event.payload.clone()).unwrap();
        });
        engine
            .manager()
            .trigger_event("alarm", "panel", json!({"level": 3}))
            .unwrap();

        let payload = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(payload, json!({"level": 3}));
        engine.shutdown();
    }

    #[test]
    fn test_stats_reflect_subscriptions() {
        let engine = engine();
        engine.manager().subscribe("a", |_| {});
        engine.manager().subscribe("b", |_| {});

        let stats = engine.stats();
        assert_eq!(stats.subscriptions, 2);
        assert_eq!(stats.pending_tickets, 0);
        assert_eq!(stats.to_string(), "2 subscriptions, 0 queued events, 0 pending tickets");
        engine.shutdown();
    }

    #[test]
    fn test_manager_is_not_on_owner_thread() {
        let engine = engine();
        assert!(!engine.manager().is_owner_thread());
        engine.shutdown();
    }
}
