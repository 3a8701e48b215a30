//! Postgres connection supervision.
//!
//! The bridge owns a single process-scoped pool, created once at startup.
//! Until the database becomes reachable the supervisor retries forever at the
//! cadence of the configured backoff policy; this is the only startup gate.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use crate::config::PostgresConfig;

/// Delay between connection attempts in production.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Supplies the delay before the next reconnection attempt.
///
/// `next_delay` is called once per failed attempt; `reset` is called after a
/// successful connection so a later policy instance starts fresh.
pub trait BackoffPolicy {
    fn next_delay(&mut self) -> Duration;
    fn reset(&mut self);
}

/// Retry at a fixed cadence, without bound.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self::new(RETRY_INTERVAL)
    }
}

impl BackoffPolicy for FixedInterval {
    fn next_delay(&mut self) -> Duration {
        self.interval
    }

    fn reset(&mut self) {}
}

/// Doubling delay, capped at `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.base;
    }
}

/// Connect to Postgres, retrying until it succeeds.
///
/// Never returns an invalid handle: each attempt eagerly establishes a real
/// connection, and failures only log and sleep. The returned pool lives for
/// the rest of the process and is closed on shutdown.
pub async fn connect_with_retry<P: BackoffPolicy>(
    config: &PostgresConfig,
    mut backoff: P,
) -> PgPool {
    loop {
        match PgPoolOptions::new()
            .max_connections(2)
            .connect_with(config.connect_options())
            .await
        {
            Ok(pool) => {
                backoff.reset();
                info!("connected to postgres at {}", config.host);
                return pool;
            }
            Err(e) => {
                let delay = backoff.next_delay();
                error!(
                    "postgres connection failed: {e}, retrying in {}s...",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
