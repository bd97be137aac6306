//! Two-phase payment saga.
//!
//! Phase 1 ([`ReservationService`]) accepts a payment, persists it and
//! reserves funds; phase 2 ([`SettlementService`]) settles the reservation
//! against the external gateway, confirming or releasing the hold.
//!
//! Consistency comes from idempotent retries and compensating actions, not
//! from distributed transactions: a gateway failure is compensated by
//! releasing the reserved funds; a gateway success is finalized by
//! confirming them. Both phases lean on the store's conditional status
//! updates to stay safe under duplicate message delivery.

pub mod error;
pub mod ports;
pub mod reservation;
pub mod settlement;

pub use error::SagaError;
pub use ports::{
    InMemoryGateway, InMemoryPublisher, InMemoryWallet, PaymentGateway, PaymentPublisher,
    PortError, PublishError, WalletConfirmer, WalletReleaser, WalletReserver,
};
pub use reservation::{PaymentCreator, ReservationService};
pub use settlement::{PaymentProcessor, SettlementService};
