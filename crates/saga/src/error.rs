//! Saga error types.
//!
//! Each variant names the stage that failed so operators can tell an
//! infrastructure fault from a handled business outcome. Business
//! failures that were correctly compensated are *not* errors here — the
//! settlement service returns `Ok` for them.

use domain::{DomainError, Status};
use store::StoreError;
use thiserror::Error;

use crate::ports::{PortError, PublishError};

/// Errors that can occur during saga execution.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request failed domain validation.
    #[error("validation: {0}")]
    Domain(#[from] DomainError),

    /// The idempotency-key lookup itself failed (not a lookup miss).
    #[error("idempotency lookup: {0}")]
    IdempotencyLookup(#[source] StoreError),

    /// Persisting the new payment failed.
    #[error("save payment: {0}")]
    Save(#[source] StoreError),

    /// Re-reading the payment before settlement failed.
    #[error("read payment: {0}")]
    Read(#[source] StoreError),

    /// A status transition could not be recorded.
    #[error("update status to {status}: {source}")]
    StatusUpdate {
        status: Status,
        #[source]
        source: StoreError,
    },

    /// The wallet refused to reserve funds.
    #[error("reserve funds: {0}")]
    Reserve(#[source] PortError),

    /// The wallet refused to confirm a settled reservation.
    #[error("confirm funds: {0}")]
    Confirm(#[source] PortError),

    /// The compensating release failed: funds may be stuck reserved.
    /// This must page someone.
    #[error("release funds: {0}")]
    Release(#[source] PortError),

    /// Handing the reserved payment to the message bus failed. The payment
    /// stays RESERVED in storage until re-driven.
    #[error("publish payment: {0}")]
    Publish(#[source] PublishError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
