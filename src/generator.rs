//! Synthetic metric producer.
//!
//! A peripheral companion to the bridge: it bootstraps the `metrics` table
//! and inserts a random sample at a fixed interval. The database-side trigger
//! that raises the notification on insert is provisioned externally.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use sqlx::PgPool;
use tracing::info;

/// Default pause between inserted samples.
pub const DEFAULT_INSERT_INTERVAL: Duration = Duration::from_secs(5);

pub struct MetricGenerator {
    pool: PgPool,
    interval: Duration,
}

impl MetricGenerator {
    pub fn new(pool: PgPool, interval: Duration) -> Self {
        Self { pool, interval }
    }

    /// Ensure the `metrics` table exists before the insert loop starts.
    pub async fn prepare(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metrics (
                id BIGSERIAL PRIMARY KEY,
                timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                value DOUBLE PRECISION NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("failed to create metrics table")?;

        info!("table 'metrics' is ready");
        Ok(())
    }

    /// Insert samples forever; any insert failure is fatal.
    pub async fn run(self) -> Result<()> {
        loop {
            let value = next_value();

            sqlx::query("INSERT INTO metrics (value) VALUES ($1)")
                .bind(value)
                .execute(&self.pool)
                .await
                .context("failed to insert metric")?;

            info!("inserted new metric value: {value}");

            tokio::time::sleep(self.interval).await;
        }
    }
}

fn next_value() -> f64 {
    rand::rng().random_range(0.0..100.0)
}
