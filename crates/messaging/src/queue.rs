//! Queue abstraction with an in-memory implementation.
//!
//! The trait captures the slice of broker behaviour the saga relies on:
//! routed publish, prefetch-bounded delivery, explicit ack/nack and a
//! dead-letter buffer. [`InMemoryQueue`] backs tests and single-process
//! runs; a broker-backed adapter implements the same trait in deployment.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::config::QueueConfig;
use crate::error::QueueError;

/// One delivery of a message to a consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Tag identifying this delivery for ack/nack.
    pub tag: u64,
    pub body: Vec<u8>,
    /// How many times this message was delivered before this one.
    pub delivery_count: u32,
}

impl Delivery {
    /// The attempt number of this delivery, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.delivery_count + 1
    }
}

/// Broker-shaped message queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Routes a message by key. Fails when no binding matches.
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), QueueError>;

    /// Waits for the next delivery. Returns `None` once the queue is
    /// closed; the prefetch bound may delay delivery until acks come in.
    async fn receive(&self) -> Result<Option<Delivery>, QueueError>;

    /// Acknowledges a delivery, removing the message for good.
    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Rejects a delivery: back onto the queue when `requeue` is set,
    /// into the dead-letter buffer otherwise.
    async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError>;
}

#[derive(Debug)]
struct Message {
    body: Vec<u8>,
    delivery_count: u32,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Message>,
    in_flight: HashMap<u64, Message>,
    dead: Vec<Message>,
    next_tag: u64,
}

/// Single-queue in-memory broker.
///
/// Two semaphores drive delivery: `ready` holds one permit per queued
/// message, `capacity` holds the prefetch allowance. Closing either one
/// wakes blocked receivers so workers can exit.
pub struct InMemoryQueue {
    binding_key: String,
    state: Mutex<QueueState>,
    ready: Semaphore,
    capacity: Semaphore,
    closed: AtomicBool,
}

impl InMemoryQueue {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            binding_key: config.routing_key.clone(),
            state: Mutex::new(QueueState::default()),
            ready: Semaphore::new(0),
            capacity: Semaphore::new(config.prefetch),
            closed: AtomicBool::new(false),
        }
    }

    /// Stops delivery. Blocked receivers return `None`; unacked messages
    /// stay in flight until their worker finishes.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.ready.close();
        self.capacity.close();
    }

    /// Messages waiting for delivery.
    pub fn ready_len(&self) -> usize {
        self.state.lock().unwrap().ready.len()
    }

    /// Delivered but not yet acked or nacked.
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().unwrap().in_flight.len()
    }

    /// Bodies of dead-lettered messages, in arrival order.
    pub fn dead_letters(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .dead
            .iter()
            .map(|m| m.body.clone())
            .collect()
    }

    fn take_in_flight(&self, tag: u64) -> Result<Message, QueueError> {
        self.state
            .lock()
            .unwrap()
            .in_flight
            .remove(&tag)
            .ok_or(QueueError::UnknownDelivery(tag))
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        if routing_key != self.binding_key {
            return Err(QueueError::Unroutable(routing_key.to_string()));
        }
        self.state.lock().unwrap().ready.push_back(Message {
            body: body.to_vec(),
            delivery_count: 0,
        });
        self.ready.add_permits(1);
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let Ok(slot) = self.capacity.acquire().await else {
            return Ok(None);
        };
        // The slot converts into an in-flight entry; ack/nack gives the
        // permit back.
        slot.forget();

        let Ok(msg_permit) = self.ready.acquire().await else {
            self.capacity.add_permits(1);
            return Ok(None);
        };
        msg_permit.forget();

        let mut state = self.state.lock().unwrap();
        // A ready permit always has a matching queued message.
        let msg = state.ready.pop_front().ok_or(QueueError::Closed)?;
        let tag = state.next_tag;
        state.next_tag += 1;
        let delivery = Delivery {
            tag,
            body: msg.body.clone(),
            delivery_count: msg.delivery_count,
        };
        state.in_flight.insert(tag, msg);
        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.take_in_flight(delivery.tag)?;
        self.capacity.add_permits(1);
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError> {
        let mut msg = self.take_in_flight(delivery.tag)?;
        let mut state = self.state.lock().unwrap();
        if requeue {
            msg.delivery_count += 1;
            state.ready.push_back(msg);
            drop(state);
            self.ready.add_permits(1);
        } else {
            state.dead.push(msg);
            drop(state);
        }
        self.capacity.add_permits(1);
        Ok(())
    }
}
