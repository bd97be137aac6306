//! Event-sourced storage for payments.
//!
//! The append-only `payment_events` log is the source of truth; the
//! `payments` table is a read model projected from it. Both are written
//! inside one transaction, and transient failures are retried with
//! exponential backoff.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod retry;
pub mod store;

pub use common::{EventId, PaymentId};
pub use error::{Result, StoreError};
pub use event::{PaymentEvent, Sequence};
pub use memory::InMemoryPaymentStore;
pub use postgres::PostgresPaymentStore;
pub use retry::RetryPolicy;
pub use store::PaymentStore;
