use common::PaymentId;
use domain::Status;
use thiserror::Error;

/// Errors that can occur when interacting with the payment store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The payment does not exist in the read model.
    #[error("payment not found: {0}")]
    NotFound(PaymentId),

    /// A payment with this idempotency key was already saved.
    #[error("idempotency key already exists: {0}")]
    Conflict(String),

    /// The conditional status update found the row in a different status.
    /// This is how concurrent settlement attempts lose the race.
    #[error("payment {payment_id} is {actual}, expected {expected}")]
    StatusConflict {
        payment_id: PaymentId,
        expected: Status,
        actual: Status,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored column held a value the domain cannot represent.
    #[error("corrupt row: {0}")]
    Decode(String),
}

impl StoreError {
    /// Returns true if the retry loop may attempt the operation again.
    ///
    /// The whitelist mirrors the failure signatures seen in production:
    /// dropped connections, pool exhaustion, deadlocks and resets.
    /// Everything else propagates immediately.
    pub fn is_transient(&self) -> bool {
        let StoreError::Database(err) = self else {
            return false;
        };
        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                msg.contains("deadlock")
                    || msg.contains("connection refused")
                    || msg.contains("connection reset")
            }
            other => {
                let msg = other.to_string();
                msg.contains("connection refused") || msg.contains("connection reset")
            }
        }
    }
}

/// Result type for payment store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
