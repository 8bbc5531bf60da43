//! Ticket registry for cross-thread payload handoff.
//!
//! Producers park a payload here and receive an integer ticket; the
//! owner thread later redeems the ticket to take the payload back out.
//! Redemption removes the entry, so every ticket is good for at most one
//! retrieval, and retrieval of an unknown or already-redeemed ticket
//! yields `None`. One mutex guards the whole registry and one monotonic
//! counter, starting at 1, issues ids for every ticket kind.

use crate::dispatcher::EventHandler;
use crate::UiEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Sentinel stored in a [`SubscribeRequest`] before the owner thread has
/// produced a subscription id.
pub const NO_SUBSCRIPTION: i64 = -1;

/// A pending subscribe operation handed across the thread boundary.
///
/// The caller constructs the request, keeps its own `Arc`, and registers
/// a clone with the [`TicketRegistry`]. After the blocking send returns,
/// the owner thread has taken the handler out exactly once and written
/// the resulting subscription id into this object, where the caller can
/// read it without any further round trip.
pub struct SubscribeRequest {
    event_type: String,
    handler: Mutex<Option<EventHandler>>,
    subscription_id: AtomicI64,
}

impl SubscribeRequest {
    /// Create a new request for `event_type` delivering to `handler`.
    pub fn new<F>(event_type: impl Into<String>, handler: F) -> Arc<Self>
    where
        F: Fn(&UiEvent) + Send + Sync + 'static,
    {
        Arc::new(Self {
            event_type: event_type.into(),
            handler: Mutex::new(Some(Arc::new(handler))),
            subscription_id: AtomicI64::new(NO_SUBSCRIPTION),
        })
    }

    /// The event type this request subscribes to.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The subscription id filled in by the owner thread, or `None` while
    /// the request has not been serviced.
    pub fn subscription_id(&self) -> Option<i64> {
        match self.subscription_id.load(Ordering::Acquire) {
            NO_SUBSCRIPTION => None,
            id => Some(id),
        }
    }

    pub(crate) fn take_handler(&self) -> Option<EventHandler> {
        self.handler.lock().take()
    }

    pub(crate) fn set_subscription_id(&self, id: i64) {
        self.subscription_id.store(id, Ordering::Release);
    }
}

impl fmt::Debug for SubscribeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeRequest")
            .field("event_type", &self.event_type)
            .field("subscription_id", &self.subscription_id.load(Ordering::Acquire))
            .finish()
    }
}

/// A pending unsubscribe operation handed across the thread boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeRequest {
    /// Event type the subscription belongs to.
    pub event_type: String,
    /// Id of the subscription to remove.
    pub subscription_id: i64,
}

#[derive(Default)]
struct RegistryState {
    pending_events: HashMap<i64, UiEvent>,
    pending_callbacks: HashMap<i64, (String, EventHandler)>,
    pending_subscribes: HashMap<i64, Arc<SubscribeRequest>>,
    pending_unsubscribes: HashMap<i64, UnsubscribeRequest>,
    subscription_results: HashMap<i64, i64>,
    next_ticket_id: i64,
}

/// Thread-safe store that turns in-process payloads into integer tickets.
///
/// The ticket is the only value that crosses the thread boundary; the
/// payload waits here until the owner thread redeems it.
pub struct TicketRegistry {
    inner: Mutex<RegistryState>,
}

impl TicketRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryState {
                next_ticket_id: 1,
                ..RegistryState::default()
            }),
        }
    }

    /// Park an event and return its ticket.
    pub fn register_event(&self, event: UiEvent) -> i64 {
        let mut state = self.inner.lock();
        let id = state.next_ticket_id;
        state.next_ticket_id += 1;
        debug!(ticket_id = id, event_type = %event.event_type, "event registered");
        state.pending_events.insert(id, event);
        id
    }

    /// Redeem an event ticket, removing the entry.
    pub fn retrieve_event(&self, id: i64) -> Option<UiEvent> {
        let mut state = self.inner.lock();
        trace!(
            ticket_id = id,
            pending = state.pending_events.len(),
            "retrieving event"
        );
        let event = state.pending_events.remove(&id);
        if event.is_none() {
            warn!(ticket_id = id, "no pending event for ticket");
        }
        event
    }

    /// Park an event type and handler pair and return its ticket.
    pub fn register_callback(&self, event_type: impl Into<String>, handler: EventHandler) -> i64 {
        let mut state = self.inner.lock();
        let id = state.next_ticket_id;
        state.next_ticket_id += 1;
        state.pending_callbacks.insert(id, (event_type.into(), handler));
        debug!(ticket_id = id, "callback registered");
        id
    }

    /// Redeem a callback ticket, removing the entry.
    pub fn retrieve_callback(&self, id: i64) -> Option<(String, EventHandler)> {
        let mut state = self.inner.lock();
        let entry = state.pending_callbacks.remove(&id);
        if entry.is_none() {
            warn!(ticket_id = id, "no pending callback for ticket");
        }
        entry
    }

    /// Park a handle to a caller-owned [`SubscribeRequest`] and return
    /// its ticket. The registry stores a handle, not a copy, so the owner
    /// thread's writes land in the caller's object.
    pub fn register_subscribe_request(&self, request: &Arc<SubscribeRequest>) -> i64 {
        let mut state = self.inner.lock();
        let id = state.next_ticket_id;
        state.next_ticket_id += 1;
        state.pending_subscribes.insert(id, Arc::clone(request));
        debug!(
            ticket_id = id,
            event_type = %request.event_type(),
            "subscribe request registered"
        );
        id
    }

    /// Redeem a subscribe-request ticket, removing the entry.
    pub fn retrieve_subscribe_request(&self, id: i64) -> Option<Arc<SubscribeRequest>> {
        let mut state = self.inner.lock();
        let request = state.pending_subscribes.remove(&id);
        if request.is_none() {
            warn!(ticket_id = id, "no pending subscribe request for ticket");
        }
        request
    }

    /// Park an unsubscribe request and return its ticket.
    pub fn register_unsubscribe_request(
        &self,
        event_type: impl Into<String>,
        subscription_id: i64,
    ) -> i64 {
        let mut state = self.inner.lock();
        let id = state.next_ticket_id;
        state.next_ticket_id += 1;
        state.pending_unsubscribes.insert(
            id,
            UnsubscribeRequest {
                event_type: event_type.into(),
                subscription_id,
            },
        );
        debug!(ticket_id = id, subscription_id, "unsubscribe request registered");
        id
    }

    /// Redeem an unsubscribe-request ticket, removing the entry.
    pub fn retrieve_unsubscribe_request(&self, id: i64) -> Option<UnsubscribeRequest> {
        let mut state = self.inner.lock();
        let request = state.pending_unsubscribes.remove(&id);
        if request.is_none() {
            warn!(ticket_id = id, "no pending unsubscribe request for ticket");
        }
        request
    }

    /// Record the subscription id produced for a deferred subscribe,
    /// keyed by the callback ticket the caller already holds.
    pub fn store_subscription_result(&self, callback_id: i64, subscription_id: i64) {
        let mut state = self.inner.lock();
        state.subscription_results.insert(callback_id, subscription_id);
        debug!(callback_id, subscription_id, "subscription result stored");
    }

    /// Take the subscription result for a callback ticket, removing it.
    pub fn take_subscription_result(&self, callback_id: i64) -> Option<i64> {
        self.inner.lock().subscription_results.remove(&callback_id)
    }

    /// Total number of payloads currently parked across all tables.
    pub fn pending_count(&self) -> usize {
        let state = self.inner.lock();
        state.pending_events.len()
            + state.pending_callbacks.len()
            + state.pending_subscribes.len()
            + state.pending_unsubscribes.len()
            + state.subscription_results.len()
    }
}

impl Default for TicketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TicketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketRegistry")
            .field("pending", &self.pending_count())
            .finish()
    }
}
