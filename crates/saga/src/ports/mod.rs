//! Outbound ports of the saga.
//!
//! The wallet, the payment gateway and the message publisher are external
//! collaborators. Each is modelled as a narrow trait so services can be
//! wired with production adapters or with the in-memory doubles below.

pub mod gateway;
pub mod publisher;
pub mod wallet;

use thiserror::Error;

pub use gateway::{InMemoryGateway, PaymentGateway};
pub use publisher::{InMemoryPublisher, PaymentPublisher};
pub use wallet::{InMemoryWallet, WalletConfirmer, WalletReleaser, WalletReserver};

/// Failure reported by a downstream collaborator (wallet or gateway).
#[derive(Debug, Error)]
pub enum PortError {
    /// The collaborator understood the request and said no.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The collaborator could not be reached or answered abnormally.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Failure handing a payment to the message bus.
#[derive(Debug, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);
