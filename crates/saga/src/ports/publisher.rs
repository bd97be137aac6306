//! Publisher port: hands reserved payments to the message bus for
//! asynchronous settlement.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::Payment;

use super::PublishError;

#[async_trait]
pub trait PaymentPublisher: Send + Sync {
    async fn publish(&self, payment: &Payment) -> Result<(), PublishError>;
}

#[derive(Debug, Default)]
struct PublisherState {
    published: Vec<Payment>,
    fail_on_publish: bool,
}

/// In-memory publisher that records what was published.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublisher {
    state: Arc<RwLock<PublisherState>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_on_publish = fail;
    }

    pub fn published(&self) -> Vec<Payment> {
        self.state.read().unwrap().published.clone()
    }
}

#[async_trait]
impl PaymentPublisher for InMemoryPublisher {
    async fn publish(&self, payment: &Payment) -> Result<(), PublishError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_publish {
            return Err(PublishError("broker unavailable".to_string()));
        }
        state.published.push(payment.clone());
        Ok(())
    }
}
