use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::error::DomainError;
use crate::money::Money;

/// A request to create a payment, as parsed from the inbound HTTP body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub user_id: String,
    pub amount_cents: Money,
    pub currency: Currency,
}

impl PaymentRequest {
    /// Validates the request shape before any side effect happens.
    pub fn validate(&self) -> Result<(), DomainError> {
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
}
