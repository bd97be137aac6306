//! Full pipeline over the in-memory queue: reservation publishes, the
//! consumer pool settles, the store ends up with the final state.

use std::sync::Arc;
use std::time::Duration;

use domain::{Currency, Money, PaymentRequest, Status};
use messaging::{
    Consumer, InMemoryQueue, MessageQueue, PaymentMessageHandler, QueueConfig, QueuePublisher,
};
use saga::{
    InMemoryGateway, InMemoryWallet, PaymentCreator, ReservationService, SettlementService,
};
use store::{InMemoryPaymentStore, PaymentStore};

struct Pipeline {
    creator: ReservationService<
        InMemoryPaymentStore,
        InMemoryWallet,
        QueuePublisher<InMemoryQueue>,
    >,
    queue: Arc<InMemoryQueue>,
    store: InMemoryPaymentStore,
    gateway: InMemoryGateway,
    config: QueueConfig,
}

fn pipeline() -> Pipeline {
    let config = QueueConfig::default().with_workers(2);
    let queue = Arc::new(InMemoryQueue::new(&config));
    let store = InMemoryPaymentStore::new();
    let wallet = InMemoryWallet::new();
    let gateway = InMemoryGateway::new();

    let publisher = QueuePublisher::new(Arc::clone(&queue), config.routing_key.clone());
    let creator = ReservationService::new(store.clone(), wallet.clone(), publisher);

    Pipeline {
        creator,
        queue,
        store,
        gateway,
        config,
    }
}

impl Pipeline {
    fn spawn_consumer(&self, wallet: InMemoryWallet) -> tokio::task::JoinHandle<()> {
        let settlement = SettlementService::new(
            self.store.clone(),
            wallet.clone(),
            wallet,
            self.gateway.clone(),
        );
        let consumer = Consumer::new(
            Arc::clone(&self.queue),
            Arc::new(PaymentMessageHandler::new(settlement)),
            self.config.clone(),
        );
        tokio::spawn(consumer.run())
    }

    async fn wait_for_status(&self, key: &str, status: Status) -> bool {
        for _ in 0..200 {
            if let Ok(Some(payment)) = self.store.get_by_idempotency_key(key).await
                && payment.status == status
            {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

fn request(user: &str, cents: i64) -> PaymentRequest {
    PaymentRequest {
        user_id: user.to_string(),
        amount_cents: Money::from_cents(cents),
        currency: Currency::Usd,
    }
}

#[tokio::test]
async fn published_payment_is_settled_by_the_pool() {
    let p = pipeline();
    p.gateway.set_reference("gw_abc");
    let pool = p.spawn_consumer(InMemoryWallet::new());

    let created = p.creator.create("key-1", &request("u1", 10050)).await.unwrap();
    assert_eq!(created.status, Status::Reserved);

    assert!(p.wait_for_status("key-1", Status::Completed).await);
    let settled = p.store.get_by_id(created.id).await.unwrap();
    assert_eq!(settled.gateway_ref.as_deref(), Some("gw_abc"));

    p.queue.close();
    pool.await.unwrap();
    assert!(p.queue.dead_letters().is_empty());
}

#[tokio::test]
async fn gateway_decline_settles_to_failed_without_dead_letters() {
    let p = pipeline();
    p.gateway.set_fail_on_process(true);
    let wallet = InMemoryWallet::new();
    let pool = p.spawn_consumer(wallet.clone());

    p.creator.create("key-2", &request("u1", 5000)).await.unwrap();

    assert!(p.wait_for_status("key-2", Status::Failed).await);
    assert_eq!(wallet.release_calls(), 1);

    p.queue.close();
    pool.await.unwrap();
    // A decline is a handled outcome, not a poison message.
    assert!(p.queue.dead_letters().is_empty());
}

#[tokio::test]
async fn many_payments_all_settle() {
    let p = pipeline();
    let pool = p.spawn_consumer(InMemoryWallet::new());

    for i in 0..20 {
        p.creator
            .create(&format!("key-{i}"), &request(&format!("u{i}"), 100 + i))
            .await
            .unwrap();
    }
    for i in 0..20 {
        assert!(p.wait_for_status(&format!("key-{i}"), Status::Completed).await);
    }

    p.queue.close();
    pool.await.unwrap();
}

#[tokio::test]
async fn garbage_on_the_queue_is_dead_lettered_and_does_not_wedge_workers() {
    let p = pipeline();
    let pool = p.spawn_consumer(InMemoryWallet::new());

    p.queue
        .publish(&p.config.routing_key, b"not a payment")
        .await
        .unwrap();
    p.creator.create("key-3", &request("u1", 750)).await.unwrap();

    assert!(p.wait_for_status("key-3", Status::Completed).await);

    p.queue.close();
    pool.await.unwrap();
    assert_eq!(p.queue.dead_letters(), vec![b"not a payment".to_vec()]);
}
