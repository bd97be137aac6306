//! Phase 2: settle a reserved payment against the gateway.
//!
//! Delivery is at-least-once, so the service re-reads the stored status
//! before acting and finishes with a conditional update. A duplicate
//! delivery either sees a terminal status and does nothing, or loses the
//! conditional update race and is treated as already handled.

use async_trait::async_trait;
use domain::{Payment, Status};
use store::{PaymentStore, StoreError};
use tracing::{info, warn};

use crate::error::{Result, SagaError};
use crate::ports::{PaymentGateway, WalletConfirmer, WalletReleaser};

/// Drives the settlement of one reserved payment. The queue consumer
/// holds this as its handler target.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Settles a payment delivered from the queue.
    ///
    /// Returns `Ok` for every outcome the saga fully handled, including
    /// gateway declines (compensated) and duplicates (skipped). An `Err`
    /// means the work is incomplete and the message must be redelivered.
    async fn process(&self, payment: &Payment) -> Result<()>;
}

/// Settlement-phase service.
pub struct SettlementService<S, C, R, G> {
    store: S,
    confirmer: C,
    releaser: R,
    gateway: G,
}

impl<S, C, R, G> SettlementService<S, C, R, G>
where
    S: PaymentStore,
    C: WalletConfirmer,
    R: WalletReleaser,
    G: PaymentGateway,
{
    pub fn new(store: S, confirmer: C, releaser: R, gateway: G) -> Self {
        Self {
            store,
            confirmer,
            releaser,
            gateway,
        }
    }

    async fn settle_failure(&self, payment: &Payment) -> Result<()> {
        // Compensation first. If the release itself fails the message
        // must come back, so this error is fatal.
        self.releaser
            .release(&payment.user_id, payment.amount_cents, payment.id)
            .await
            .map_err(SagaError::Release)?;

        match self
            .store
            .update_status(payment.id, Status::Reserved, Status::Failed, None)
            .await
        {
            Ok(()) => {}
            Err(StoreError::StatusConflict { actual, .. }) => {
                warn!(payment_id = %payment.id, %actual, "lost the status race recording FAILED");
            }
            Err(source) => {
                return Err(SagaError::StatusUpdate {
                    status: Status::Failed,
                    source,
                });
            }
        }
        metrics::counter!("payments_settlement_declined_total").increment(1);
        Ok(())
    }

    async fn settle_success(&self, payment: &Payment, gateway_ref: &str) -> Result<()> {
        self.confirmer
            .confirm(&payment.user_id, payment.amount_cents, payment.id)
            .await
            .map_err(SagaError::Confirm)?;

        match self
            .store
            .update_status(
                payment.id,
                Status::Reserved,
                Status::Completed,
                Some(gateway_ref),
            )
            .await
        {
            Ok(()) => {}
            Err(StoreError::StatusConflict { actual, .. }) => {
                warn!(payment_id = %payment.id, %actual, "lost the status race recording COMPLETED");
            }
            Err(source) => {
                return Err(SagaError::StatusUpdate {
                    status: Status::Completed,
                    source,
                });
            }
        }
        info!(payment_id = %payment.id, gateway_ref, "payment completed");
        metrics::counter!("payments_settled_total").increment(1);
        Ok(())
    }
}

#[async_trait]
impl<S, C, R, G> PaymentProcessor for SettlementService<S, C, R, G>
where
    S: PaymentStore,
    C: WalletConfirmer,
    R: WalletReleaser,
    G: PaymentGateway,
{
    #[tracing::instrument(skip(self, payment), fields(payment_id = %payment.id))]
    async fn process(&self, payment: &Payment) -> Result<()> {
        // The message is a snapshot; the stored row decides.
        let current = self.store.get_by_id(payment.id).await.map_err(SagaError::Read)?;

        match current.status {
            Status::Reserved => {}
            Status::Completed | Status::Failed => {
                info!(status = %current.status, "payment already settled, skipping");
                metrics::counter!("payments_duplicate_deliveries_total").increment(1);
                return Ok(());
            }
            other => {
                warn!(status = %other, "payment not reserved yet, skipping");
                return Ok(());
            }
        }

        match self
            .gateway
            .process(current.id, current.amount_cents)
            .await
        {
            Ok(gateway_ref) => self.settle_success(&current, &gateway_ref).await,
            Err(err) => {
                warn!(error = %err, "gateway declined, releasing reserved funds");
                self.settle_failure(&current).await
            }
        }
    }
}
