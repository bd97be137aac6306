//! Worker-pool consumer.
//!
//! Each worker loops on the queue, hands message bodies to the handler
//! under a processing deadline, and acks or nacks based on the outcome.
//! A message that keeps failing is requeued until the delivery-attempt
//! bound is hit, then dead-lettered so it stops blocking the queue.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::QueueConfig;
use crate::error::HandlerError;
use crate::queue::{Delivery, MessageQueue};

/// Processes one message body.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, body: &[u8]) -> Result<(), HandlerError>;
}

/// Pool of workers draining one queue into one handler.
pub struct Consumer<Q, H> {
    queue: Arc<Q>,
    handler: Arc<H>,
    config: QueueConfig,
}

impl<Q, H> Consumer<Q, H>
where
    Q: MessageQueue + 'static,
    H: MessageHandler + 'static,
{
    pub fn new(queue: Arc<Q>, handler: Arc<H>, config: QueueConfig) -> Self {
        Self {
            queue,
            handler,
            config,
        }
    }

    /// Spawns the worker tasks. Each worker runs until the queue closes.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        info!(
            queue = %self.config.queue,
            workers = self.config.workers,
            prefetch = self.config.prefetch,
            "starting consumer workers"
        );
        (0..self.config.workers)
            .map(|worker_id| {
                let queue = Arc::clone(&self.queue);
                let handler = Arc::clone(&self.handler);
                let config = self.config.clone();
                tokio::spawn(async move {
                    worker(worker_id, queue, handler, config).await;
                })
            })
            .collect()
    }

    /// Runs the pool to completion, returning once the queue is closed
    /// and every worker has drained its in-flight work.
    pub async fn run(self) {
        for handle in self.spawn() {
            let _ = handle.await;
        }
    }
}

async fn worker<Q, H>(worker_id: usize, queue: Arc<Q>, handler: Arc<H>, config: QueueConfig)
where
    Q: MessageQueue,
    H: MessageHandler,
{
    loop {
        let delivery = match queue.receive().await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                info!(worker_id, "queue closed, worker stopping");
                return;
            }
            Err(err) => {
                error!(worker_id, error = %err, "receive failed, worker stopping");
                return;
            }
        };

        let started = Instant::now();
        let outcome =
            tokio::time::timeout(config.process_timeout, handler.handle(&delivery.body)).await;
        metrics::histogram!("queue_message_processing_seconds")
            .record(started.elapsed().as_secs_f64());

        let verdict = match outcome {
            Ok(Ok(())) => Verdict::Ack,
            Ok(Err(HandlerError::Rejected(reason))) => {
                warn!(worker_id, %reason, "message rejected, dead-lettering");
                Verdict::DeadLetter
            }
            Ok(Err(HandlerError::Failed(err))) => {
                warn!(worker_id, attempt = delivery.attempt(), error = %err, "processing failed");
                Verdict::retry_or_bury(&delivery, &config)
            }
            Err(_) => {
                warn!(
                    worker_id,
                    attempt = delivery.attempt(),
                    timeout_secs = config.process_timeout.as_secs_f64(),
                    "processing timed out"
                );
                Verdict::retry_or_bury(&delivery, &config)
            }
        };

        let settled = match verdict {
            Verdict::Ack => {
                metrics::counter!("queue_messages_processed_total").increment(1);
                queue.ack(&delivery).await
            }
            Verdict::Requeue => {
                metrics::counter!("queue_messages_requeued_total").increment(1);
                queue.nack(&delivery, true).await
            }
            Verdict::DeadLetter => {
                metrics::counter!("queue_messages_dead_lettered_total").increment(1);
                queue.nack(&delivery, false).await
            }
        };
        if let Err(err) = settled {
            error!(worker_id, error = %err, "failed to settle delivery");
        }
    }
}

enum Verdict {
    Ack,
    Requeue,
    DeadLetter,
}

impl Verdict {
    fn retry_or_bury(delivery: &Delivery, config: &QueueConfig) -> Self {
        if delivery.attempt() >= config.max_delivery_attempts {
            error!(
                attempt = delivery.attempt(),
                max = config.max_delivery_attempts,
                "delivery attempts exhausted, dead-lettering"
            );
            Verdict::DeadLetter
        } else {
            Verdict::Requeue
        }
    }
}
