use thiserror::Error;

/// Errors from the message queue itself.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has been closed; no further publishes or receives.
    #[error("queue closed")]
    Closed,

    /// No binding matched the routing key; the message would be lost.
    #[error("no binding for routing key {0}")]
    Unroutable(String),

    /// Ack or nack referenced a delivery the queue is not tracking.
    #[error("unknown delivery tag {0}")]
    UnknownDelivery(u64),
}

/// Outcome of handling one message, as seen by the consumer.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The message can never succeed (malformed or invalid payload).
    /// The consumer dead-letters it without retrying.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// Processing failed but may succeed on redelivery.
    #[error("processing failed: {0}")]
    Failed(#[source] saga::SagaError),
}
