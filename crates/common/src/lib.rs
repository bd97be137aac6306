pub mod types;

pub use types::{EventId, PaymentId};
