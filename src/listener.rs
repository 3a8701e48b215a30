//! Postgres notification listening and draining.
//!
//! The listener subscribes once, then alternates between a bounded-timeout
//! wait and a full drain of everything queued since the last drain. Samples
//! are handed to the forwarder over a bounded channel in strict arrival
//! order.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::MetricSample;
use crate::config::DecodeErrorPolicy;
use crate::decode::decode;

/// How long one wait for channel activity may block before logging and
/// re-waiting. Bounds idle log noise while keeping forwarding latency low.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of raw notification payloads for one channel.
///
/// Production uses sqlx's `PgListener`; tests substitute a scripted source.
#[async_trait]
pub trait NotificationSource {
    /// Issue the subscription command once per connection lifetime.
    async fn subscribe(&mut self, channel: &str) -> sqlx::Result<()>;

    /// Wait for the next payload. Resolves immediately while payloads are
    /// already buffered.
    async fn recv(&mut self) -> sqlx::Result<String>;
}

#[async_trait]
impl NotificationSource for PgListener {
    async fn subscribe(&mut self, channel: &str) -> sqlx::Result<()> {
        self.listen(channel).await
    }

    async fn recv(&mut self) -> sqlx::Result<String> {
        let notification = PgListener::recv(self).await?;
        Ok(notification.payload().to_string())
    }
}

/// Task that owns the dedicated notification connection.
///
/// After construction, call [`subscribe`](Self::subscribe) once, then
/// [`run`](Self::run); `run` only returns on a fatal error.
pub struct NotificationListener<S> {
    source: S,
    channel: String,
    sample_tx: mpsc::Sender<MetricSample>,
    decode_errors: DecodeErrorPolicy,
}

impl<S: NotificationSource + Send> NotificationListener<S> {
    pub fn new(
        source: S,
        channel: impl Into<String>,
        sample_tx: mpsc::Sender<MetricSample>,
        decode_errors: DecodeErrorPolicy,
    ) -> Self {
        Self {
            source,
            channel: channel.into(),
            sample_tx,
            decode_errors,
        }
    }

    /// Issue the subscription command for the configured channel.
    pub async fn subscribe(&mut self) -> Result<()> {
        self.source
            .subscribe(&self.channel)
            .await
            .with_context(|| format!("failed to subscribe to channel '{}'", self.channel))?;

        info!("listening on channel '{}'", self.channel);
        Ok(())
    }

    /// Wait/drain forever.
    ///
    /// Returns only when the notification stream fails, the sample channel
    /// closes, or a payload fails to decode under the `fail` policy.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let activity = timeout(WAIT_TIMEOUT, self.source.recv()).await;
            match activity {
                Err(_) => {
                    debug!("no new notifications...");
                }
                Ok(payload) => {
                    let payload = payload.context("notification stream failed")?;
                    self.drain(payload).await?;
                }
            }
        }
    }

    /// Process one wake-up: the notification that woke us plus everything
    /// already queued behind it, in arrival order.
    async fn drain(&mut self, first: String) -> Result<()> {
        trace!("received notification: {first}");
        dispatch(&first, self.decode_errors, &self.sample_tx).await?;

        // A zero timeout still polls the source once, so payloads already
        // buffered on the connection complete immediately.
        while let Ok(next) = timeout(Duration::ZERO, self.source.recv()).await {
            let next = next.context("notification stream failed")?;
            trace!("received notification: {next}");
            dispatch(&next, self.decode_errors, &self.sample_tx).await?;
        }

        Ok(())
    }
}

/// Decode one payload and hand the sample to the forwarder.
///
/// What a decode failure means depends on the configured policy; a closed
/// sample channel is always fatal.
pub async fn dispatch(
    payload: &str,
    policy: DecodeErrorPolicy,
    sample_tx: &mpsc::Sender<MetricSample>,
) -> Result<()> {
    match decode(payload) {
        Ok(sample) => sample_tx
            .send(sample)
            .await
            .context("sample channel closed, forwarder is gone")?,
        Err(e) => match policy {
            DecodeErrorPolicy::Fail => {
                return Err(e).with_context(|| format!("undecodable notification payload: {payload}"));
            }
            DecodeErrorPolicy::Skip => {
                warn!("skipping undecodable notification payload: {e}");
            }
        },
    }

    Ok(())
}
