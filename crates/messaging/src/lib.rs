//! Message bus plumbing between the two saga phases.
//!
//! The reservation service publishes reserved payments through
//! [`QueuePublisher`]; a [`Consumer`] worker pool receives them and drives
//! [`PaymentMessageHandler`], acking on success and requeueing on failure
//! until the delivery-attempt bound moves the message to the dead-letter
//! buffer.

pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod publisher;
pub mod queue;

pub use config::QueueConfig;
pub use consumer::{Consumer, MessageHandler};
pub use error::{HandlerError, QueueError};
pub use handler::PaymentMessageHandler;
pub use publisher::QueuePublisher;
pub use queue::{Delivery, InMemoryQueue, MessageQueue};
