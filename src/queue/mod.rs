//! Decoupled asynchronous fan-out queue.
//!
//! A single consumer thread drains a thread-safe FIFO of events and
//! hands each one to the dispatcher, isolating slow or panicking
//! subscribers from producers. Each dispatch runs with the queue's
//! internal lock released, so producers are never blocked by a handler.
//!
//! The dispatcher must outlive the queue's consumer; the queue holds a
//! shared handle to enforce that.

use crate::dispatcher::EventDispatcher;
use crate::error::{Error, Result};
use crate::UiEvent;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

#[derive(Default)]
struct QueueState {
    events: VecDeque<UiEvent>,
    running: bool,
}

struct QueueShared {
    state: Mutex<QueueState>,
    not_empty: Condvar,
}

/// Unbounded FIFO of events with a single consumer thread.
///
/// Events enqueued by one producer are dispatched in that producer's
/// enqueue order; no ordering is guaranteed across producers. The queue
/// never applies back-pressure — unbounded growth is accepted, with a
/// warning logged once the configured depth is crossed.
pub struct EventQueue {
    shared: Arc<QueueShared>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    thread_name: String,
    warn_depth: usize,
}

impl EventQueue {
    /// Create a new empty queue with no consumer running.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(QueueShared {
                state: Mutex::new(QueueState::default()),
                not_empty: Condvar::new(),
            }),
            consumer: Mutex::new(None),
            thread_name: "ui-event-queue".to_string(),
            warn_depth: 10_000,
        }
    }

    /// Set the name given to the consumer thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the queue depth at which a warning is logged.
    pub fn warn_depth(mut self, depth: usize) -> Self {
        self.warn_depth = depth;
        self
    }

    /// Append an event and wake the consumer.
    ///
    /// Never blocks the producer beyond the internal lock; events
    /// enqueued before the consumer starts are drained once it does.
    pub fn enqueue(&self, event: UiEvent) {
        let mut state = self.shared.state.lock();
        state.events.push_back(event);
        if state.events.len() == self.warn_depth {
            warn!(depth = self.warn_depth, "event queue depth threshold reached");
        }
        drop(state);
        self.shared.not_empty.notify_one();
    }

    /// Spawn the consumer thread bound to `dispatcher`.
    ///
    /// Fails with [`Error::ConsumerAlreadyRunning`] if a consumer was
    /// already started on this queue, even a stopped one; a queue runs
    /// at most one consumer over its lifetime.
    pub fn start_processing(&self, dispatcher: Arc<EventDispatcher>) -> Result<()> {
        let mut consumer = self.consumer.lock();
        if consumer.is_some() {
            return Err(Error::ConsumerAlreadyRunning);
        }

        self.shared.state.lock().running = true;
        let shared = Arc::clone(&self.shared);
        let handle = match thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || consumer_loop(&shared, &dispatcher))
        {
            Ok(handle) => handle,
            Err(source) => {
                self.shared.state.lock().running = false;
                return Err(Error::ThreadSpawn {
                    name: self.thread_name.clone(),
                    source,
                });
            }
        };
        *consumer = Some(handle);

        info!(thread = %self.thread_name, "event queue consumer started");
        Ok(())
    }

    /// Signal the consumer to exit and wake it if blocked. Idempotent.
    ///
    /// Stopping takes priority over draining: events still queued when
    /// the stop is observed are abandoned.
    pub fn stop_processing(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
        }
        self.shared.not_empty.notify_all();
        debug!("event queue stop requested");
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.shared.state.lock().events.len()
    }

    /// Whether the queue currently holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the consumer has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }
}

fn consumer_loop(shared: &QueueShared, dispatcher: &EventDispatcher) {
    debug!("event queue consumer running");
    let mut state = shared.state.lock();
    while state.running {
        shared
            .not_empty
            .wait_while(&mut state, |s| s.events.is_empty() && s.running);
        if !state.running {
            break;
        }

        while state.running {
            let Some(event) = state.events.pop_front() else {
                break;
            };
            MutexGuard::unlocked(&mut state, || {
                trace!(event_type = %event.event_type, "processing event from queue");
                if catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(&event))).is_err() {
                    error!(event_type = %event.event_type, "dispatch panicked");
                }
            });
        }
    }
    debug!("event queue consumer stopped");
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        self.stop_processing();
        if let Some(handle) = self.consumer.lock().take() {
            if handle.join().is_err() {
                error!("event queue consumer panicked");
            }
        }
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.len())
            .field("running", &self.is_running())
            .field("thread_name", &self.thread_name)
            .finish()
    }
}
