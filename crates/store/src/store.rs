use std::sync::Arc;

use async_trait::async_trait;
use common::PaymentId;
use domain::{Payment, Status};

use crate::{PaymentEvent, Result};

/// Storage contract for the payment saga.
///
/// Both representations — the append-only event log and the derived read
/// model — are owned exclusively by implementations of this trait; every
/// write touches both inside a single transaction. All implementations
/// must be thread-safe (Send + Sync).
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a new payment: the sequence-1 `created` event plus the
    /// read-model row, atomically.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict)
    /// if the idempotency key already exists.
    async fn save(&self, payment: &Payment) -> Result<()>;

    /// Appends a status-change event at `MAX(sequence) + 1` and updates the
    /// read-model row, atomically, but only if the row is currently in the
    /// `from` status.
    ///
    /// Fails with [`StoreError::NotFound`](crate::StoreError::NotFound) when
    /// the payment does not exist, and with
    /// [`StoreError::StatusConflict`](crate::StoreError::StatusConflict) when
    /// another writer got there first. The conditional update is what makes
    /// concurrent redeliveries of the same payment safe.
    async fn update_status(
        &self,
        payment_id: PaymentId,
        from: Status,
        to: Status,
        gateway_ref: Option<&str>,
    ) -> Result<()>;

    /// Read-model lookup by payment ID.
    async fn get_by_id(&self, payment_id: PaymentId) -> Result<Payment>;

    /// Read-model lookup by idempotency key.
    ///
    /// Absence is an expected outcome ("no duplicate submission yet"), not
    /// an error — the reservation phase depends on this distinction.
    async fn get_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<Payment>>;

    /// Returns all events for a payment, ordered by sequence ascending.
    /// Returns an empty vec, not an error, when none exist.
    async fn get_events_by_payment_id(&self, payment_id: PaymentId) -> Result<Vec<PaymentEvent>>;
}

// Lets callers pick the backing store at runtime and still use the
// generic services: `Arc<dyn PaymentStore>` is itself a store.
#[async_trait]
impl<T> PaymentStore for Arc<T>
where
    T: PaymentStore + ?Sized,
{
    async fn save(&self, payment: &Payment) -> Result<()> {
        (**self).save(payment).await
    }

    async fn update_status(
        &self,
        payment_id: PaymentId,
        from: Status,
        to: Status,
        gateway_ref: Option<&str>,
    ) -> Result<()> {
        (**self).update_status(payment_id, from, to, gateway_ref).await
    }

    async fn get_by_id(&self, payment_id: PaymentId) -> Result<Payment> {
        (**self).get_by_id(payment_id).await
    }

    async fn get_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<Payment>> {
        (**self).get_by_idempotency_key(idempotency_key).await
    }

    async fn get_events_by_payment_id(&self, payment_id: PaymentId) -> Result<Vec<PaymentEvent>> {
        (**self).get_events_by_payment_id(payment_id).await
    }
}
