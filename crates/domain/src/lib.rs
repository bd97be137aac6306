//! Domain layer for the payment processing system.
//!
//! This crate provides the core payment abstractions:
//! - The `Payment` aggregate and its JSON wire encoding
//! - The `Status` state machine (PENDING → RESERVED → COMPLETED | FAILED)
//! - `Money` in fixed-point minor units and the supported `Currency` set
//! - `PaymentRequest` validation for incoming create requests

pub mod currency;
pub mod error;
pub mod money;
pub mod payment;
pub mod request;
pub mod status;

pub use common::PaymentId;
pub use currency::Currency;
pub use error::DomainError;
pub use money::Money;
pub use payment::Payment;
pub use request::PaymentRequest;
pub use status::Status;
