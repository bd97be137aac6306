//! Application configuration loaded from environment variables.

use std::time::Duration;

use messaging::QueueConfig;

/// Server and broker configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — Postgres connection string; in-memory store when unset
/// - `QUEUE_EXCHANGE`, `QUEUE_NAME`, `QUEUE_ROUTING_KEY` — broker topology
/// - `QUEUE_WORKERS` — settlement worker count (default: `4`)
/// - `QUEUE_MAX_DELIVERY_ATTEMPTS` — before dead-lettering (default: `3`)
/// - `QUEUE_PROCESS_TIMEOUT_SECS` — per-message deadline (default: `30`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub queue: QueueConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut queue = QueueConfig::default();
        if let Ok(exchange) = std::env::var("QUEUE_EXCHANGE") {
            queue.exchange = exchange;
        }
        if let Ok(name) = std::env::var("QUEUE_NAME") {
            // The routing key follows the queue name unless overridden.
            queue.routing_key = name.clone();
            queue.queue = name;
        }
        if let Ok(key) = std::env::var("QUEUE_ROUTING_KEY") {
            queue.routing_key = key;
        }
        if let Some(workers) = env_parse("QUEUE_WORKERS") {
            queue = queue.with_workers(workers);
        }
        if let Some(attempts) = env_parse("QUEUE_MAX_DELIVERY_ATTEMPTS") {
            queue.max_delivery_attempts = attempts;
        }
        if let Some(secs) = env_parse("QUEUE_PROCESS_TIMEOUT_SECS") {
            queue.process_timeout = Duration::from_secs(secs);
        }

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT").unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            queue,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            queue: QueueConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
