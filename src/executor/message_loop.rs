//! Reference owner-thread executor backed by a message loop thread.
//!
//! Stands in for a platform UI message pump: `post` enqueues a ticket
//! for later handling, `send` blocks until the loop thread has handled
//! the ticket, and a `send` issued on the loop thread itself runs the
//! handler inline, the way a UI thread re-enters its own window
//! procedure.

use super::{OwnerExecutor, Ticket, TicketRouter};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error};

const LOOP_THREAD_NAME: &str = "owner-loop";

enum LoopMessage {
    Post(Ticket),
    Send(Ticket, SyncSender<()>),
    Quit,
}

/// A channel-driven owner thread implementing [`OwnerExecutor`].
///
/// Useful as the default host in tests and demos, and as the model for
/// wiring the engine to a real platform message pump.
pub struct MessageLoop {
    sender: Mutex<Sender<LoopMessage>>,
    router: Arc<TicketRouter>,
    owner: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MessageLoop {
    /// Spawn the loop thread, which services tickets through `router`
    /// until [`shutdown`](MessageLoop::shutdown) or drop.
    pub fn spawn(router: Arc<TicketRouter>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let loop_router = Arc::clone(&router);

        let handle = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("owner message loop running");
                while let Ok(message) = receiver.recv() {
                    match message {
                        LoopMessage::Post(ticket) => loop_router.handle(ticket),
                        LoopMessage::Send(ticket, done) => {
                            loop_router.handle(ticket);
                            let _ = done.send(());
                        }
                        LoopMessage::Quit => break,
                    }
                }
                debug!("owner message loop stopped");
            })
            .map_err(|source| Error::ThreadSpawn {
                name: LOOP_THREAD_NAME.to_string(),
                source,
            })?;

        let owner = handle.thread().id();
        Ok(Self {
            sender: Mutex::new(sender),
            router,
            owner,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Ask the loop thread to exit after the tickets already queued, and
    /// join it. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.sender.lock().send(LoopMessage::Quit);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!("owner message loop panicked");
            }
        }
    }
}

impl OwnerExecutor for MessageLoop {
    fn post(&self, ticket: Ticket) -> Result<()> {
        self.sender
            .lock()
            .send(LoopMessage::Post(ticket))
            .map_err(|_| Error::ExecutorClosed)
    }

    fn send(&self, ticket: Ticket) -> Result<()> {
        if self.is_owner_thread() {
            self.router.handle(ticket);
            return Ok(());
        }

        let (done, handled) = mpsc::sync_channel(0);
        self.sender
            .lock()
            .send(LoopMessage::Send(ticket, done))
            .map_err(|_| Error::ExecutorClosed)?;
        handled.recv().map_err(|_| Error::ExecutorClosed)
    }

    fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

impl Drop for MessageLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for MessageLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageLoop")
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::EventDispatcher;
    use crate::executor::TicketKind;
    use crate::queue::EventQueue;
    use crate::registry::{SubscribeRequest, TicketRegistry};
    use crate::UiEvent;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        message_loop: MessageLoop,
        dispatcher: Arc<EventDispatcher>,
        registry: Arc<TicketRegistry>,
        queue: Arc<EventQueue>,
    }

    fn fixture() -> Fixture {
        let dispatcher = Arc::new(EventDispatcher::new());
        let registry = Arc::new(TicketRegistry::new());
        let queue = Arc::new(EventQueue::new());
        let router = Arc::new(TicketRouter::new(
            dispatcher.clone(),
            registry.clone(),
            queue.clone(),
        ));
        Fixture {
            message_loop: MessageLoop::spawn(router).unwrap(),
            dispatcher,
            registry,
            queue,
        }
    }

    #[test]
    fn test_posted_ticket_is_handled_on_loop_thread() {
        let f = fixture();
        let id = f
            .registry
            .register_event(UiEvent::new("tick", "test", json!({})));

        f.message_loop
            .post(Ticket::new(TicketKind::Event, id))
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while f.queue.is_empty() {
            assert!(std::time::Instant::now() < deadline, "ticket never handled");
            thread::yield_now();
        }
    }

    #[test]
    fn test_send_returns_only_after_handling() {
        let f = fixture();
        let request = SubscribeRequest::new("alarm", |_| {});
        let ticket_id = f.registry.register_subscribe_request(&request);

        f.message_loop
            .send(Ticket::new(TicketKind::Subscribe, ticket_id))
            .unwrap();

        assert!(request.subscription_id().is_some());
        assert_eq!(f.dispatcher.subscription_count("alarm"), 1);
    }

    #[test]
    fn test_caller_thread_is_not_owner() {
        let f = fixture();
        assert!(!f.message_loop.is_owner_thread());
    }

    #[test]
    fn test_post_after_shutdown_reports_closed() {
        let f = fixture();
        f.message_loop.shutdown();

        let err = f
            .message_loop
            .post(Ticket::new(TicketKind::Event, 1))
            .unwrap_err();
        assert!(err.is_executor_closed());
    }
}
