use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::PaymentId;
use domain::{Payment, Status};
use tokio::sync::RwLock;

use crate::{PaymentEvent, PaymentStore, Result, Sequence, StoreError, event};

#[derive(Default)]
struct Inner {
    payments: HashMap<PaymentId, Payment>,
    events: Vec<PaymentEvent>,
}

/// In-memory payment store for testing.
///
/// Provides the same contract as the PostgreSQL implementation, including
/// the conditional status update; the `RwLock` write guard plays the role
/// of the transaction.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPaymentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events across all payments.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn save(&self, payment: &Payment) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner
            .payments
            .values()
            .any(|p| p.idempotency_key == payment.idempotency_key)
        {
            return Err(StoreError::Conflict(payment.idempotency_key.clone()));
        }

        inner.events.push(PaymentEvent::created(payment));
        inner.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        payment_id: PaymentId,
        from: Status,
        to: Status,
        gateway_ref: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        let current = inner
            .payments
            .get(&payment_id)
            .map(|p| p.status)
            .ok_or(StoreError::NotFound(payment_id))?;

        if current != from {
            return Err(StoreError::StatusConflict {
                payment_id,
                expected: from,
                actual: current,
            });
        }

        let next_sequence = inner
            .events
            .iter()
            .filter(|e| e.payment_id == payment_id)
            .map(|e| e.sequence)
            .max()
            .unwrap_or_default()
            .next();

        inner.events.push(event::PaymentEvent::status_changed(
            payment_id,
            next_sequence,
            to,
            gateway_ref,
        ));

        let payment = inner
            .payments
            .get_mut(&payment_id)
            .ok_or(StoreError::NotFound(payment_id))?;
        payment.status = to;
        payment.gateway_ref = gateway_ref.map(String::from);
        payment.updated_at = Utc::now();

        Ok(())
    }

    async fn get_by_id(&self, payment_id: PaymentId) -> Result<Payment> {
        self.inner
            .read()
            .await
            .payments
            .get(&payment_id)
            .cloned()
            .ok_or(StoreError::NotFound(payment_id))
    }

    async fn get_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<Payment>> {
        Ok(self
            .inner
            .read()
            .await
            .payments
            .values()
            .find(|p| p.idempotency_key == idempotency_key)
            .cloned())
    }

    async fn get_events_by_payment_id(&self, payment_id: PaymentId) -> Result<Vec<PaymentEvent>> {
        let inner = self.inner.read().await;
        let mut events: Vec<_> = inner
            .events
            .iter()
            .filter(|e| e.payment_id == payment_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use domain::{Currency, Money};

    use super::*;

    fn payment(key: &str) -> Payment {
        Payment::new(key, "u1", Money::from_cents(10050), Currency::Usd)
    }

    #[tokio::test]
    async fn save_and_get_by_id() {
        let store = InMemoryPaymentStore::new();
        let p = payment("k1");
        store.save(&p).await.unwrap();

        let loaded = store.get_by_id(p.id).await.unwrap();
        assert_eq!(loaded, p);

        let events = store.get_events_by_payment_id(p.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, Sequence::first());
        assert_eq!(events[0].event_type, "created");
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_conflicts() {
        let store = InMemoryPaymentStore::new();
        store.save(&payment("k1")).await.unwrap();

        let result = store.save(&payment("k1")).await;
        assert!(matches!(result, Err(StoreError::Conflict(key)) if key == "k1"));
    }

    #[tokio::test]
    async fn idempotency_lookup_absent_is_none_not_error() {
        let store = InMemoryPaymentStore::new();
        assert!(
            store
                .get_by_idempotency_key("missing")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn update_status_appends_sequential_events() {
        let store = InMemoryPaymentStore::new();
        let p = payment("k1");
        store.save(&p).await.unwrap();

        store
            .update_status(p.id, Status::Pending, Status::Reserved, None)
            .await
            .unwrap();
        store
            .update_status(p.id, Status::Reserved, Status::Completed, Some("gw_abc"))
            .await
            .unwrap();

        let loaded = store.get_by_id(p.id).await.unwrap();
        assert_eq!(loaded.status, Status::Completed);
        assert_eq!(loaded.gateway_ref.as_deref(), Some("gw_abc"));

        let events = store.get_events_by_payment_id(p.id).await.unwrap();
        let sequences: Vec<i64> = events.iter().map(|e| e.sequence.as_i64()).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["created", "RESERVED", "COMPLETED"]);
    }

    #[tokio::test]
    async fn conditional_update_rejects_stale_writers() {
        let store = InMemoryPaymentStore::new();
        let p = payment("k1");
        store.save(&p).await.unwrap();
        store
            .update_status(p.id, Status::Pending, Status::Reserved, None)
            .await
            .unwrap();
        store
            .update_status(p.id, Status::Reserved, Status::Completed, Some("gw_1"))
            .await
            .unwrap();

        // A concurrent worker that also saw RESERVED loses the race.
        let result = store
            .update_status(p.id, Status::Reserved, Status::Failed, None)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::StatusConflict {
                expected: Status::Reserved,
                actual: Status::Completed,
                ..
            })
        ));

        // No event was appended for the losing writer.
        assert_eq!(store.event_count().await, 3);
    }

    #[tokio::test]
    async fn update_status_of_unknown_payment_is_not_found() {
        let store = InMemoryPaymentStore::new();
        let result = store
            .update_status(PaymentId::new(), Status::Pending, Status::Reserved, None)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn events_of_unknown_payment_is_empty_not_error() {
        let store = InMemoryPaymentStore::new();
        let events = store
            .get_events_by_payment_id(PaymentId::new())
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
