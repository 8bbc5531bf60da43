//! Configuration for the event engine.

/// Configuration for the event engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name given to the async event queue's consumer thread.
    pub consumer_thread_name: String,

    /// Start the queue consumer as part of engine construction.
    pub start_consumer: bool,

    /// Queue depth at which a warning is logged. Growth is never capped;
    /// crossing the threshold only logs.
    pub queue_warn_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            consumer_thread_name: "ui-event-queue".to_string(),
            start_consumer: true,
            queue_warn_depth: 10_000,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the consumer thread name
    pub fn consumer_thread_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_thread_name = name.into();
        self
    }

    /// Set whether the consumer starts with the engine
    pub fn start_consumer(mut self, start: bool) -> Self {
        self.start_consumer = start;
        self
    }

    /// Set the queue-depth warning threshold
    pub fn queue_warn_depth(mut self, depth: usize) -> Self {
        self.queue_warn_depth = depth;
        self
    }

    /// Configuration for testing
    pub fn test() -> Self {
        Self::default()
            .consumer_thread_name("test-event-queue")
            .queue_warn_depth(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_builders() {
        let config = EngineConfig::new()
            .consumer_thread_name("worker")
            .start_consumer(false)
            .queue_warn_depth(5);

        assert_eq!(config.consumer_thread_name, "worker");
        assert!(!config.start_consumer);
        assert_eq!(config.queue_warn_depth, 5);
    }
}
