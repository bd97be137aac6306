//! Queue-backed implementation of the saga's publisher port.

use std::sync::Arc;

use async_trait::async_trait;
use domain::Payment;
use saga::{PaymentPublisher, PublishError};
use tracing::debug;

use crate::queue::MessageQueue;

/// Publishes reserved payments to the settlement queue as JSON.
pub struct QueuePublisher<Q> {
    queue: Arc<Q>,
    routing_key: String,
}

impl<Q: MessageQueue> QueuePublisher<Q> {
    pub fn new(queue: Arc<Q>, routing_key: impl Into<String>) -> Self {
        Self {
            queue,
            routing_key: routing_key.into(),
        }
    }
}

#[async_trait]
impl<Q: MessageQueue> PaymentPublisher for QueuePublisher<Q> {
    async fn publish(&self, payment: &Payment) -> Result<(), PublishError> {
        let body = payment
            .to_bytes()
            .map_err(|err| PublishError(format!("encode payment: {err}")))?;
        self.queue
            .publish(&self.routing_key, &body)
            .await
            .map_err(|err| PublishError(err.to_string()))?;
        debug!(payment_id = %payment.id, routing_key = %self.routing_key, "payment published");
        metrics::counter!("queue_messages_published_total").increment(1);
        Ok(())
    }
}
