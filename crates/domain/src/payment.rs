use chrono::{DateTime, Utc};
use common::PaymentId;
use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::error::DomainError;
use crate::money::Money;
use crate::status::Status;

/// The payment aggregate root.
///
/// The JSON encoding of this struct is the wire contract for the message
/// bus: phase 1 publishes a serialized `Payment` and the queue consumer
/// parses it back. Monetary amounts travel as integer minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Generator-assigned identifier.
    pub id: PaymentId,
    /// Caller-supplied token, unique across all payments.
    pub idempotency_key: String,
    /// Owner of the wallet being charged.
    pub user_id: String,
    /// Amount in minor units.
    pub amount_cents: Money,
    pub currency: Currency,
    pub status: Status,
    /// External processor's reference, set when the payment completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new payment in the `Pending` state.
    pub fn new(
        idempotency_key: impl Into<String>,
        user_id: impl Into<String>,
        amount_cents: Money,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            idempotency_key: idempotency_key.into(),
            user_id: user_id.into(),
            amount_cents,
            currency,
            status: Status::Pending,
            gateway_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validates the fields a consumed queue message must carry.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.idempotency_key.is_empty() {
            return Err(DomainError::Validation(
                "idempotency key is required".to_string(),
            ));
        }
        if self.user_id.is_empty() {
            return Err(DomainError::Validation("user ID is required".to_string()));
        }
        if !self.amount_cents.is_positive() {
            return Err(DomainError::Validation(
                "amount must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies a status change, touching the updated-at timestamp.
    pub fn update_status(&mut self, status: Status) -> Result<(), DomainError> {
        self.status = self.status.transition_to(status)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Parses a payment from a JSON message body.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Encodes the payment for the message bus.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
