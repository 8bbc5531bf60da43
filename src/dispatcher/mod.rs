//! Synchronous publish/subscribe dispatch.
//!
//! The dispatcher maintains a mutex-guarded map from event-type strings
//! to ordered subscriber lists. Dispatch copies the subscriber list into
//! a local snapshot and releases the lock before invoking any handler,
//! so no lock is ever held across user code and handlers removed during
//! an in-flight dispatch still run if they were present in the snapshot.

use crate::UiEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Callback invoked with every dispatched event of the subscribed type.
///
/// Handlers run synchronously on the dispatching thread and must not
/// assume any particular thread affinity.
pub type EventHandler = Arc<dyn Fn(&UiEvent) + Send + Sync + 'static>;

#[derive(Clone)]
struct SubscriptionInfo {
    id: i64,
    handler: EventHandler,
}

struct DispatcherState {
    handlers: HashMap<String, Vec<SubscriptionInfo>>,
    next_subscription_id: i64,
}

/// Thread-safe publish/subscribe table keyed by event type.
///
/// Subscription ids are monotonic and unique per dispatcher instance,
/// starting at 1.
pub struct EventDispatcher {
    inner: Mutex<DispatcherState>,
}

impl EventDispatcher {
    /// Create a new dispatcher with no subscriptions.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DispatcherState {
                handlers: HashMap::new(),
                next_subscription_id: 1,
            }),
        }
    }

    /// Subscribe a handler to an event type and return its subscription id.
    pub fn subscribe<F>(&self, event_type: impl Into<String>, handler: F) -> i64
    where
        F: Fn(&UiEvent) + Send + Sync + 'static,
    {
        self.subscribe_handler(event_type, Arc::new(handler))
    }

    /// Subscribe a pre-wrapped [`EventHandler`].
    ///
    /// Used by the owner-thread ticket router, which receives handlers
    /// that already crossed a thread boundary in wrapped form.
    pub fn subscribe_handler(&self, event_type: impl Into<String>, handler: EventHandler) -> i64 {
        let event_type = event_type.into();
        let mut state = self.inner.lock();
        let subscription_id = state.next_subscription_id;
        state.next_subscription_id += 1;
        state
            .handlers
            .entry(event_type.clone())
            .or_default()
            .push(SubscriptionInfo {
                id: subscription_id,
                handler,
            });
        debug!(
            subscription_id,
            event_type = %event_type,
            "handler subscribed"
        );
        subscription_id
    }

    /// Remove a subscription, returning whether a match was found.
    ///
    /// An unknown event type or subscription id is a no-op returning
    /// `false`.
    pub fn unsubscribe(&self, event_type: &str, subscription_id: i64) -> bool {
        let mut state = self.inner.lock();
        let Some(list) = state.handlers.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != subscription_id);
        let removed = list.len() != before;
        if removed {
            if list.is_empty() {
                state.handlers.remove(event_type);
            }
            debug!(subscription_id, event_type, "handler unsubscribed");
        }
        removed
    }

    /// Invoke every handler subscribed to the event's type, in
    /// registration order, on the calling thread.
    ///
    /// A handler that panics is caught and logged; remaining handlers in
    /// the same dispatch still run.
    pub fn dispatch(&self, event: &UiEvent) {
        trace!(event_type = %event.event_type, "dispatching event");

        let snapshot: Vec<SubscriptionInfo> = {
            let state = self.inner.lock();
            state
                .handlers
                .get(&event.event_type)
                .cloned()
                .unwrap_or_default()
        };

        for subscription in &snapshot {
            let handler = &subscription.handler;
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(
                    subscription_id = subscription.id,
                    event_type = %event.event_type,
                    "event handler panicked"
                );
            }
        }
    }

    /// Number of subscriptions currently registered for an event type.
    pub fn subscription_count(&self, event_type: &str) -> usize {
        self.inner
            .lock()
            .handlers
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Total number of subscriptions across all event types.
    pub fn total_subscriptions(&self) -> usize {
        self.inner.lock().handlers.values().map(Vec::len).sum()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("EventDispatcher")
            .field("event_types", &state.handlers.len())
            .field("next_subscription_id", &state.next_subscription_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex as StdMutex;

    fn event(event_type: &str) -> UiEvent {
        UiEvent::new(event_type, "test", json!({}))
    }

    #[test]
    fn test_dispatch_without_subscribers_is_a_no_op() {
        let dispatcher = EventDispatcher::new();
        dispatcher.dispatch(&event("nobody-listens"));
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let dispatcher = EventDispatcher::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = order.clone();
            dispatcher.subscribe("tick", move |_| order.lock().unwrap().push(tag));
        }

        dispatcher.dispatch(&event("tick"));
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_subscription_ids_are_monotonic_from_one() {
        let dispatcher = EventDispatcher::new();
        assert_eq!(dispatcher.subscribe("x", |_| {}), 1);
        assert_eq!(dispatcher.subscribe("y", |_| {}), 2);
        assert_eq!(dispatcher.subscribe("x", |_| {}), 3);
    }

    #[test]
    fn test_unsubscribe_removes_handler() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicI64::new(0));

        let calls_clone = calls.clone();
        let id = dispatcher.subscribe("tick", move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&event("tick"));
        assert!(dispatcher.unsubscribe("tick", id));
        dispatcher.dispatch(&event("tick"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.subscription_count("tick"), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_returns_false() {
        let dispatcher = EventDispatcher::new();
        let id = dispatcher.subscribe("tick", |_| {});

        assert!(!dispatcher.unsubscribe("tick", id + 100));
        assert!(!dispatcher.unsubscribe("no-such-type", id));
        assert_eq!(dispatcher.subscription_count("tick"), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_the_rest() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicI64::new(0));

        dispatcher.subscribe("tick", |_| panic!("boom"));
        let calls_clone = calls.clone();
        dispatcher.subscribe("tick", move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&event("tick"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.subscription_count("tick"), 2);
    }

    #[test]
    fn test_handler_removed_mid_dispatch_still_runs_from_snapshot() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let second_id = Arc::new(AtomicI64::new(0));
        let second_ran = Arc::new(AtomicI64::new(0));

        let d = dispatcher.clone();
        let target = second_id.clone();
        dispatcher.subscribe("tick", move |_| {
            d.unsubscribe("tick", target.load(Ordering::SeqCst));
        });

        let ran = second_ran.clone();
        let id = dispatcher.subscribe("tick", move |_| {
            ran.fetch_add(1, Ordering::SeqCst);
        });
        second_id.store(id, Ordering::SeqCst);

        dispatcher.dispatch(&event("tick"));
        assert_eq!(second_ran.load(Ordering::SeqCst), 1);

        dispatcher.dispatch(&event("tick"));
        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
    }
}
