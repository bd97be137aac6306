use std::time::Duration;

/// Broker topology and consumer tuning.
///
/// Exchange, queue and routing-key names are deployment configuration,
/// not code constants; the defaults match the payments topology.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Exchange the publisher targets.
    pub exchange: String,
    /// Queue the consumer drains.
    pub queue: String,
    /// Routing key binding the queue to the exchange.
    pub routing_key: String,
    /// Number of consumer workers.
    pub workers: usize,
    /// Maximum unacked deliveries held at once.
    pub prefetch: usize,
    /// Deliveries of one message before it is dead-lettered.
    pub max_delivery_attempts: u32,
    /// Per-message processing deadline.
    pub process_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        let workers = 4;
        Self {
            exchange: "payments".to_string(),
            queue: "payments.created".to_string(),
            routing_key: "payments.created".to_string(),
            workers,
            prefetch: workers * 2,
            max_delivery_attempts: 3,
            process_timeout: Duration::from_secs(30),
        }
    }
}

impl QueueConfig {
    /// Sets the worker count, keeping prefetch at twice the workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.prefetch = self.workers * 2;
        self
    }
}
