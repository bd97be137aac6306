//! Bridges queue deliveries to the settlement saga.

use async_trait::async_trait;
use domain::Payment;
use saga::PaymentProcessor;
use tracing::debug;

use crate::consumer::MessageHandler;
use crate::error::HandlerError;

/// Decodes a payment message and drives the settlement processor.
pub struct PaymentMessageHandler<P> {
    processor: P,
}

impl<P: PaymentProcessor> PaymentMessageHandler<P> {
    pub fn new(processor: P) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl<P: PaymentProcessor> MessageHandler for PaymentMessageHandler<P> {
    async fn handle(&self, body: &[u8]) -> Result<(), HandlerError> {
        let payment = Payment::parse(body)
            .map_err(|err| HandlerError::Rejected(format!("malformed payment message: {err}")))?;
        payment
            .validate()
            .map_err(|err| HandlerError::Rejected(format!("invalid payment message: {err}")))?;

        debug!(payment_id = %payment.id, "settling payment from queue");
        self.processor
            .process(&payment)
            .await
            .map_err(HandlerError::Failed)
    }
}
