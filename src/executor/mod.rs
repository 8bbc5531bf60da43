//! Owner-thread delivery interface and ticket routing.
//!
//! The engine never moves rich objects across the thread boundary to the
//! owner thread; it moves integer tickets. The host supplies the two
//! delivery primitives ([`OwnerExecutor::post`] and
//! [`OwnerExecutor::send`]) and drives [`TicketRouter::handle`] from its
//! owner thread for every ticket that arrives.

use crate::dispatcher::EventDispatcher;
use crate::error::Result;
use crate::queue::EventQueue;
use crate::registry::TicketRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod message_loop;

pub use message_loop::MessageLoop;

/// Which registry table a ticket's payload lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketKind {
    /// A parked [`UiEvent`](crate::UiEvent) bound for the async queue.
    Event,
    /// A parked event-type/handler pair for a deferred subscribe.
    Callback,
    /// A parked [`SubscribeRequest`](crate::SubscribeRequest) handle.
    Subscribe,
    /// A parked [`UnsubscribeRequest`](crate::UnsubscribeRequest).
    Unsubscribe,
    /// A stored subscription result; never delivered as a ticket.
    SubscriptionResult,
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TicketKind::Event => "event",
            TicketKind::Callback => "callback",
            TicketKind::Subscribe => "subscribe",
            TicketKind::Unsubscribe => "unsubscribe",
            TicketKind::SubscriptionResult => "subscription-result",
        };
        f.write_str(name)
    }
}

/// An opaque handle referencing a payload parked in the ticket registry,
/// redeemable exactly once on the owner thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    /// The registry table the payload lives in.
    pub kind: TicketKind,
    /// The registry id of the payload.
    pub id: i64,
}

impl Ticket {
    /// Create a ticket handle.
    pub fn new(kind: TicketKind, id: i64) -> Self {
        Self { kind, id }
    }
}

/// Cross-thread delivery primitives provided by the host that owns the
/// designated owner thread.
///
/// The two modes must stay distinct: `post` is fire-and-forget, `send`
/// parks the caller until the owner thread has finished handling the
/// ticket. Callers must never issue a `send` that the owner thread would
/// wait on in turn; the engine does not detect that deadlock.
pub trait OwnerExecutor: Send + Sync {
    /// Non-blocking delivery; the ticket is handled later on the owner
    /// thread.
    fn post(&self, ticket: Ticket) -> Result<()>;

    /// Blocking delivery; returns only after the owner thread has
    /// finished handling the ticket. An implementation must run the
    /// handler inline when called from the owner thread itself instead
    /// of deadlocking.
    fn send(&self, ticket: Ticket) -> Result<()>;

    /// Whether the calling thread is the owner thread.
    fn is_owner_thread(&self) -> bool;
}

/// Owner-thread entry points: redeems tickets against the registry and
/// performs the matching dispatcher or queue operation.
///
/// The host calls [`handle`](TicketRouter::handle) on its owner thread
/// for every ticket delivered through its executor.
pub struct TicketRouter {
    dispatcher: Arc<EventDispatcher>,
    registry: Arc<TicketRegistry>,
    queue: Arc<EventQueue>,
}

impl TicketRouter {
    /// Create a router over the engine's three shared structures.
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        registry: Arc<TicketRegistry>,
        queue: Arc<EventQueue>,
    ) -> Self {
        Self {
            dispatcher,
            registry,
            queue,
        }
    }

    /// Handle one delivered ticket.
    ///
    /// Expired or unknown tickets are logged and otherwise ignored.
    pub fn handle(&self, ticket: Ticket) {
        match ticket.kind {
            TicketKind::Event => {
                let Some(event) = self.registry.retrieve_event(ticket.id) else {
                    return;
                };
                self.queue.enqueue(event);
            }
            TicketKind::Callback => {
                let Some((event_type, handler)) = self.registry.retrieve_callback(ticket.id)
                else {
                    return;
                };
                let subscription_id = self.dispatcher.subscribe_handler(event_type, handler);
                self.registry
                    .store_subscription_result(ticket.id, subscription_id);
            }
            TicketKind::Subscribe => {
                let Some(request) = self.registry.retrieve_subscribe_request(ticket.id) else {
                    return;
                };
                let Some(handler) = request.take_handler() else {
                    warn!(ticket_id = ticket.id, "subscribe request has no handler left");
                    return;
                };
                let subscription_id = self
                    .dispatcher
                    .subscribe_handler(request.event_type().to_owned(), handler);
                request.set_subscription_id(subscription_id);
                debug!(
                    ticket_id = ticket.id,
                    subscription_id,
                    event_type = %request.event_type(),
                    "subscribe request serviced"
                );
            }
            TicketKind::Unsubscribe => {
                let Some(request) = self.registry.retrieve_unsubscribe_request(ticket.id) else {
                    return;
                };
                if !self
                    .dispatcher
                    .unsubscribe(&request.event_type, request.subscription_id)
                {
                    warn!(
                        subscription_id = request.subscription_id,
                        event_type = %request.event_type,
                        "unsubscribe request matched no subscription"
                    );
                }
            }
            TicketKind::SubscriptionResult => {
                warn!(
                    ticket_id = ticket.id,
                    "subscription results are polled, not delivered as tickets"
                );
            }
        }
    }
}

impl fmt::Debug for TicketRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketRouter")
            .field("dispatcher", &self.dispatcher)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UiEvent;
    use serde_json::json;

    fn router() -> (TicketRouter, Arc<EventDispatcher>, Arc<TicketRegistry>, Arc<EventQueue>) {
        let dispatcher = Arc::new(EventDispatcher::new());
        let registry = Arc::new(TicketRegistry::new());
        let queue = Arc::new(EventQueue::new());
        let router = TicketRouter::new(dispatcher.clone(), registry.clone(), queue.clone());
        (router, dispatcher, registry, queue)
    }

    #[test]
    fn test_event_ticket_lands_in_queue() {
        let (router, _, registry, queue) = router();
        let id = registry.register_event(UiEvent::new("tick", "test", json!({})));

        router.handle(Ticket::new(TicketKind::Event, id));
        assert_eq!(queue.len(), 1);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_unknown_ticket_is_ignored() {
        let (router, _, _, queue) = router();
        router.handle(Ticket::new(TicketKind::Event, 999));
        router.handle(Ticket::new(TicketKind::Subscribe, 999));
        router.handle(Ticket::new(TicketKind::SubscriptionResult, 999));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_callback_ticket_subscribes_and_stores_result() {
        let (router, dispatcher, registry, _) = router();
        let callback_id = registry.register_callback("alarm", Arc::new(|_| {}));

        router.handle(Ticket::new(TicketKind::Callback, callback_id));

        assert_eq!(dispatcher.subscription_count("alarm"), 1);
        let subscription_id = registry.take_subscription_result(callback_id).unwrap();
        assert!(subscription_id >= 1);
    }

    #[test]
    fn test_subscribe_and_unsubscribe_tickets() {
        let (router, dispatcher, registry, _) = router();
        let request = crate::SubscribeRequest::new("alarm", |_| {});
        let ticket_id = registry.register_subscribe_request(&request);

        router.handle(Ticket::new(TicketKind::Subscribe, ticket_id));
        let subscription_id = request.subscription_id().unwrap();
        assert_eq!(dispatcher.subscription_count("alarm"), 1);

        let unsub_id = registry.register_unsubscribe_request("alarm", subscription_id);
        router.handle(Ticket::new(TicketKind::Unsubscribe, unsub_id));
        assert_eq!(dispatcher.subscription_count("alarm"), 0);
    }
}
