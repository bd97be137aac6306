//! API server and settlement worker entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::payments::AppState;
use messaging::{Consumer, InMemoryQueue, PaymentMessageHandler, QueuePublisher};
use saga::{InMemoryGateway, InMemoryWallet, ReservationService, SettlementService};
use store::{InMemoryPaymentStore, PaymentStore, PostgresPaymentStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the payment store
    let store: Arc<dyn PaymentStore> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresPaymentStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using Postgres payment store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory payment store");
            Arc::new(InMemoryPaymentStore::new())
        }
    };

    // 4. Wire the saga: queue, wallet and gateway adapters, both services
    let queue = Arc::new(InMemoryQueue::new(&config.queue));
    let wallet = InMemoryWallet::new();
    let gateway = InMemoryGateway::new();

    let publisher = QueuePublisher::new(Arc::clone(&queue), config.queue.routing_key.clone());
    let creator = ReservationService::new(Arc::clone(&store), wallet.clone(), publisher);

    let settlement = SettlementService::new(
        Arc::clone(&store),
        wallet.clone(),
        wallet.clone(),
        gateway,
    );
    let consumer = Consumer::new(
        Arc::clone(&queue),
        Arc::new(PaymentMessageHandler::new(settlement)),
        config.queue.clone(),
    );
    let workers = consumer.spawn();

    // 5. Build the application
    let state = Arc::new(AppState {
        creator: Arc::new(creator),
        store: Arc::clone(&store),
    });
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Drain the settlement workers before exiting
    queue.close();
    for handle in workers {
        let _ = handle.await;
    }
    tracing::info!("server shut down gracefully");
}
