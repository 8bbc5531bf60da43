//! Builder pattern for constructing engine instances.

use crate::dispatcher::EventDispatcher;
use crate::executor::{MessageLoop, OwnerExecutor, TicketRouter};
use crate::manager::config::EngineConfig;
use crate::manager::{EventEngine, EventManager};
use crate::queue::EventQueue;
use crate::registry::TicketRegistry;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Builder for creating [`EventEngine`] instances
#[derive(Debug, Default)]
pub struct EventEngineBuilder {
    config: EngineConfig,
}

impl EventEngineBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Use a custom configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure the engine
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(EngineConfig) -> EngineConfig,
    {
        self.config = f(self.config);
        self
    }

    /// Build the engine with the reference [`MessageLoop`] as the owner
    /// executor. The loop is owned by the engine and joined on shutdown.
    pub fn build(self) -> Result<EventEngine> {
        self.build_inner(|router| {
            let message_loop = Arc::new(MessageLoop::spawn(router)?);
            let executor: Arc<dyn OwnerExecutor> = message_loop.clone();
            Ok((executor, Some(message_loop)))
        })
    }

    /// Build the engine around a host-supplied owner executor.
    ///
    /// The factory receives the engine's [`TicketRouter`], which the host
    /// must drive from its owner thread for every delivered ticket.
    pub fn build_with_executor<F>(self, make_executor: F) -> Result<EventEngine>
    where
        F: FnOnce(Arc<TicketRouter>) -> Result<Arc<dyn OwnerExecutor>>,
    {
        self.build_inner(|router| Ok((make_executor(router)?, None)))
    }

    fn build_inner<F>(self, make_executor: F) -> Result<EventEngine>
    where
        F: FnOnce(Arc<TicketRouter>) -> Result<(Arc<dyn OwnerExecutor>, Option<Arc<MessageLoop>>)>,
    {
        info!("building event engine");

        let dispatcher = Arc::new(EventDispatcher::new());
        let registry = Arc::new(TicketRegistry::new());
        let queue = Arc::new(
            EventQueue::new()
                .thread_name(self.config.consumer_thread_name.clone())
                .warn_depth(self.config.queue_warn_depth),
        );
        let router = Arc::new(TicketRouter::new(
            dispatcher.clone(),
            registry.clone(),
            queue.clone(),
        ));

        let (executor, message_loop) = make_executor(router)?;

        if self.config.start_consumer {
            queue.start_processing(dispatcher.clone())?;
        }

        let manager = EventManager::new(dispatcher.clone(), registry.clone(), executor);

        info!("event engine built");
        Ok(EventEngine {
            dispatcher,
            registry,
            queue,
            manager,
            message_loop,
        })
    }
}
