use thiserror::Error;

use crate::status::Status;

/// Errors raised by payment domain rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The request or message failed shape validation. Terminal, never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The currency is not in the supported set.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// The requested status change would leave a terminal state or skip a phase.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },
}
