//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use domain::{Currency, Money, Payment, Status};
use sqlx::PgPool;
use store::{PaymentId, PaymentStore, PostgresPaymentStore, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_payment_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresPaymentStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE payments, payment_events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresPaymentStore::new(pool)
}

fn test_payment(key: &str) -> Payment {
    Payment::new(key, "u1", Money::from_cents(10050), Currency::Usd)
}

#[tokio::test]
async fn save_and_get_by_id() {
    let store = get_test_store().await;
    let payment = test_payment("k1");

    store.save(&payment).await.unwrap();

    let loaded = store.get_by_id(payment.id).await.unwrap();
    assert_eq!(loaded.id, payment.id);
    assert_eq!(loaded.idempotency_key, "k1");
    assert_eq!(loaded.amount_cents, Money::from_cents(10050));
    assert_eq!(loaded.currency, Currency::Usd);
    assert_eq!(loaded.status, Status::Pending);
    assert!(loaded.gateway_ref.is_none());
}

#[tokio::test]
async fn save_writes_the_created_event() {
    let store = get_test_store().await;
    let payment = test_payment("k2");

    store.save(&payment).await.unwrap();

    let events = store.get_events_by_payment_id(payment.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].sequence.as_i64(), 1);
    assert_eq!(events[0].event_type, "created");
    assert_eq!(events[0].payload["idempotency_key"], "k2");
    assert_eq!(events[0].payload["amount_cents"], 10050);
}

#[tokio::test]
async fn duplicate_idempotency_key_is_a_conflict() {
    let store = get_test_store().await;
    store.save(&test_payment("k3")).await.unwrap();

    let result = store.save(&test_payment("k3")).await;
    assert!(matches!(result, Err(StoreError::Conflict(key)) if key == "k3"));
}

#[tokio::test]
async fn idempotency_lookup_miss_is_none() {
    let store = get_test_store().await;
    let found = store.get_by_idempotency_key("missing").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn idempotency_lookup_hit_returns_the_payment() {
    let store = get_test_store().await;
    let payment = test_payment("k4");
    store.save(&payment).await.unwrap();

    let found = store.get_by_idempotency_key("k4").await.unwrap().unwrap();
    assert_eq!(found.id, payment.id);
}

#[tokio::test]
async fn get_by_id_miss_is_not_found() {
    let store = get_test_store().await;
    let result = store.get_by_id(PaymentId::new()).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn full_lifecycle_produces_ordered_events() {
    let store = get_test_store().await;
    let payment = test_payment("k5");
    store.save(&payment).await.unwrap();

    store
        .update_status(payment.id, Status::Pending, Status::Reserved, None)
        .await
        .unwrap();
    store
        .update_status(payment.id, Status::Reserved, Status::Completed, Some("gw_abc"))
        .await
        .unwrap();

    let loaded = store.get_by_id(payment.id).await.unwrap();
    assert_eq!(loaded.status, Status::Completed);
    assert_eq!(loaded.gateway_ref.as_deref(), Some("gw_abc"));

    let events = store.get_events_by_payment_id(payment.id).await.unwrap();
    let sequences: Vec<i64> = events.iter().map(|e| e.sequence.as_i64()).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["created", "RESERVED", "COMPLETED"]);
}

#[tokio::test]
async fn conditional_update_rejects_a_stale_expectation() {
    let store = get_test_store().await;
    let payment = test_payment("k6");
    store.save(&payment).await.unwrap();

    store
        .update_status(payment.id, Status::Pending, Status::Reserved, None)
        .await
        .unwrap();
    store
        .update_status(payment.id, Status::Reserved, Status::Completed, Some("gw_1"))
        .await
        .unwrap();

    let result = store
        .update_status(payment.id, Status::Reserved, Status::Failed, None)
        .await;
    assert!(matches!(
        result,
        Err(StoreError::StatusConflict {
            expected: Status::Reserved,
            actual: Status::Completed,
            ..
        })
    ));

    // The losing writer appended nothing.
    let events = store.get_events_by_payment_id(payment.id).await.unwrap();
    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn update_status_of_unknown_payment_is_not_found() {
    let store = get_test_store().await;
    let result = store
        .update_status(PaymentId::new(), Status::Pending, Status::Reserved, None)
        .await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn failed_payment_has_no_gateway_ref() {
    let store = get_test_store().await;
    let payment = test_payment("k7");
    store.save(&payment).await.unwrap();

    store
        .update_status(payment.id, Status::Pending, Status::Reserved, None)
        .await
        .unwrap();
    store
        .update_status(payment.id, Status::Reserved, Status::Failed, None)
        .await
        .unwrap();

    let loaded = store.get_by_id(payment.id).await.unwrap();
    assert_eq!(loaded.status, Status::Failed);
    assert!(loaded.gateway_ref.is_none());

    let events = store.get_events_by_payment_id(payment.id).await.unwrap();
    assert_eq!(events[2].event_type, "FAILED");
    assert_eq!(events[2].payload["gateway_ref"], "");
}

#[tokio::test]
async fn events_of_unknown_payment_is_empty() {
    let store = get_test_store().await;
    let events = store
        .get_events_by_payment_id(PaymentId::new())
        .await
        .unwrap();
    assert!(events.is_empty());
}
