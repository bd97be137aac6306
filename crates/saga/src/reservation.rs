//! Phase 1: accept a payment, reserve funds, hand off for settlement.
//!
//! Flow: idempotency check, persist PENDING, reserve funds, record
//! RESERVED, publish for asynchronous settlement. A wallet rejection is
//! compensated by recording FAILED before the error is surfaced.

use async_trait::async_trait;
use domain::{Payment, PaymentRequest, Status};
use store::PaymentStore;
use tracing::{info, warn};

use crate::error::{Result, SagaError};
use crate::ports::{PaymentPublisher, WalletReserver};

/// Entry point the HTTP layer drives. Object-safe so the router can hold
/// a `dyn` handle regardless of the concrete wiring.
#[async_trait]
pub trait PaymentCreator: Send + Sync {
    /// Creates a payment, or returns the existing one when the
    /// idempotency key has been seen before.
    async fn create(&self, idempotency_key: &str, request: &PaymentRequest) -> Result<Payment>;
}

/// Reservation-phase service, generic over its collaborators so tests
/// can wire in-memory doubles.
pub struct ReservationService<S, W, P> {
    store: S,
    wallet: W,
    publisher: P,
}

impl<S, W, P> ReservationService<S, W, P>
where
    S: PaymentStore,
    W: WalletReserver,
    P: PaymentPublisher,
{
    pub fn new(store: S, wallet: W, publisher: P) -> Self {
        Self {
            store,
            wallet,
            publisher,
        }
    }
}

#[async_trait]
impl<S, W, P> PaymentCreator for ReservationService<S, W, P>
where
    S: PaymentStore,
    W: WalletReserver,
    P: PaymentPublisher,
{
    #[tracing::instrument(skip(self, request), fields(idempotency_key = %idempotency_key))]
    async fn create(&self, idempotency_key: &str, request: &PaymentRequest) -> Result<Payment> {
        if idempotency_key.is_empty() {
            return Err(SagaError::Domain(domain::DomainError::Validation(
                "idempotency key is required".to_string(),
            )));
        }
        request.validate()?;

        if let Some(existing) = self
            .store
            .get_by_idempotency_key(idempotency_key)
            .await
            .map_err(SagaError::IdempotencyLookup)?
        {
            info!(payment_id = %existing.id, "duplicate submission, returning existing payment");
            metrics::counter!("payments_duplicate_submissions_total").increment(1);
            return Ok(existing);
        }

        let mut payment = Payment::new(
            idempotency_key,
            request.user_id.clone(),
            request.amount_cents,
            request.currency,
        );
        self.store.save(&payment).await.map_err(SagaError::Save)?;

        if let Err(err) = self
            .wallet
            .reserve(&payment.user_id, payment.amount_cents, payment.id)
            .await
        {
            warn!(payment_id = %payment.id, error = %err, "fund reservation rejected");
            self.store
                .update_status(payment.id, Status::Pending, Status::Failed, None)
                .await
                .map_err(|source| SagaError::StatusUpdate {
                    status: Status::Failed,
                    source,
                })?;
            metrics::counter!("payments_reservation_failures_total").increment(1);
            return Err(SagaError::Reserve(err));
        }

        self.store
            .update_status(payment.id, Status::Pending, Status::Reserved, None)
            .await
            .map_err(|source| SagaError::StatusUpdate {
                status: Status::Reserved,
                source,
            })?;
        payment.update_status(Status::Reserved)?;

        self.publisher
            .publish(&payment)
            .await
            .map_err(SagaError::Publish)?;

        info!(payment_id = %payment.id, amount = %payment.amount_cents, "payment reserved and enqueued");
        metrics::counter!("payments_created_total").increment(1);
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use domain::{Currency, Money};
    use store::InMemoryPaymentStore;

    use super::*;
    use crate::ports::{InMemoryPublisher, InMemoryWallet};

    fn request() -> PaymentRequest {
        PaymentRequest {
            user_id: "u1".to_string(),
            amount_cents: Money::from_cents(10050),
            currency: Currency::Usd,
        }
    }

    fn service() -> (
        ReservationService<InMemoryPaymentStore, InMemoryWallet, InMemoryPublisher>,
        InMemoryPaymentStore,
        InMemoryWallet,
        InMemoryPublisher,
    ) {
        let store = InMemoryPaymentStore::new();
        let wallet = InMemoryWallet::new();
        let publisher = InMemoryPublisher::new();
        let service = ReservationService::new(store.clone(), wallet.clone(), publisher.clone());
        (service, store, wallet, publisher)
    }

    #[tokio::test]
    async fn create_reserves_and_publishes() {
        let (service, store, wallet, publisher) = service();

        let payment = service.create("k1", &request()).await.unwrap();

        assert_eq!(payment.status, Status::Reserved);
        assert_eq!(payment.amount_cents, Money::from_cents(10050));
        assert!(wallet.has_reservation(payment.id));
        assert_eq!(wallet.reserve_calls(), 1);

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, payment.id);
        assert_eq!(published[0].status, Status::Reserved);

        let events = store.get_events_by_payment_id(payment.id).await.unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["created", "RESERVED"]);
    }

    #[tokio::test]
    async fn duplicate_key_returns_existing_without_side_effects() {
        let (service, _store, wallet, publisher) = service();

        let first = service.create("k1", &request()).await.unwrap();
        let second = service.create("k1", &request()).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(wallet.reserve_calls(), 1);
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn wallet_rejection_records_failed() {
        let (service, store, wallet, publisher) = service();
        wallet.set_fail_on_reserve(true);

        let result = service.create("k1", &request()).await;
        assert!(matches!(result, Err(SagaError::Reserve(_))));

        let stored = store.get_by_idempotency_key("k1").await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Failed);
        assert!(publisher.published().is_empty());

        let events = store.get_events_by_payment_id(stored.id).await.unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["created", "FAILED"]);
    }

    #[tokio::test]
    async fn publish_failure_leaves_payment_reserved() {
        let (service, store, _wallet, publisher) = service();
        publisher.set_fail_on_publish(true);

        let result = service.create("k1", &request()).await;
        assert!(matches!(result, Err(SagaError::Publish(_))));

        // The reservation is durable; a re-drive can pick it up later.
        let stored = store.get_by_idempotency_key("k1").await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Reserved);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_any_side_effect() {
        let (service, store, wallet, _publisher) = service();

        let mut bad = request();
        bad.amount_cents = Money::zero();
        let result = service.create("k1", &bad).await;
        assert!(matches!(result, Err(SagaError::Domain(_))));

        assert!(store.get_by_idempotency_key("k1").await.unwrap().is_none());
        assert_eq!(wallet.reserve_calls(), 0);
    }

    #[tokio::test]
    async fn empty_idempotency_key_is_rejected() {
        let (service, _store, wallet, _publisher) = service();

        let result = service.create("", &request()).await;
        assert!(matches!(result, Err(SagaError::Domain(_))));
        assert_eq!(wallet.reserve_calls(), 0);
    }
}
