use chrono::{DateTime, Utc};
use common::{EventId, PaymentId};
use domain::{Payment, Status};
use serde::{Deserialize, Serialize};

/// Per-payment event sequence number.
///
/// Sequences start at 1 for the `created` event and increment by 1 for
/// each status change, assigned transactionally from `MAX(sequence) + 1`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Sequence(i64);

impl Sequence {
    /// Creates a sequence from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the sequence of the `created` event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next sequence.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Sequence {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// An immutable entry in the payment event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: EventId,
    pub payment_id: PaymentId,
    pub sequence: Sequence,
    /// `"created"` for the first event, otherwise the target status string.
    pub event_type: String,
    /// JSON snapshot captured when the event was written.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PaymentEvent {
    /// Builds the sequence-1 `created` event with a full payment snapshot.
    pub fn created(payment: &Payment) -> Self {
        Self {
            id: EventId::new(),
            payment_id: payment.id,
            sequence: Sequence::first(),
            event_type: "created".to_string(),
            payload: serde_json::json!({
                "payment_id": payment.id,
                "idempotency_key": payment.idempotency_key,
                "user_id": payment.user_id,
                "amount_cents": payment.amount_cents,
                "currency": payment.currency,
                "status": payment.status,
            }),
            created_at: payment.created_at,
        }
    }

    /// Builds a status-change event at the given sequence.
    pub fn status_changed(
        payment_id: PaymentId,
        sequence: Sequence,
        status: Status,
        gateway_ref: Option<&str>,
    ) -> Self {
        Self {
            id: EventId::new(),
            payment_id,
            sequence,
            event_type: status.as_str().to_string(),
            payload: serde_json::json!({
                "payment_id": payment_id,
                "status": status,
                "gateway_ref": gateway_ref.unwrap_or(""),
            }),
            created_at: Utc::now(),
        }
    }
}
