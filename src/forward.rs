//! Best-effort forwarding of samples to the streaming sink.
//!
//! The forwarder consumes a bounded channel fed by the listener and pushes one
//! frame per sample over a transient websocket connection. Sink failures are
//! logged and swallowed: the sample is dropped, delivery is at-most-once, and
//! the listener keeps running.

use anyhow::{Context, Result};
use futures::SinkExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::MetricSample;

/// Capacity of the listener → forwarder sample channel.
///
/// When the forwarder lags behind a burst, the listener blocks on send
/// instead of queueing without bound.
pub const SAMPLE_BUFFER: usize = 64;

/// One message in the sink's frame format: named field arrays, always
/// `"time"` then `"value"`, each holding exactly one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamFrame {
    pub fields: Vec<FrameField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameField {
    pub name: String,
    pub values: Vec<serde_json::Value>,
}

impl From<&MetricSample> for StreamFrame {
    fn from(sample: &MetricSample) -> Self {
        Self {
            fields: vec![
                FrameField {
                    name: "time".to_string(),
                    values: vec![json!(sample.timestamp)],
                },
                FrameField {
                    name: "value".to_string(),
                    values: vec![json!(sample.value)],
                },
            ],
        }
    }
}

/// Task that drains the sample channel and pushes each sample to the sink.
///
/// Forwards are strictly serialized: the next sample is not taken off the
/// channel until the previous one has either been sent or dropped.
pub struct StreamForwarder {
    sink_url: String,
    sample_rx: mpsc::Receiver<MetricSample>,
}

impl StreamForwarder {
    pub fn new(sink_url: String, sample_rx: mpsc::Receiver<MetricSample>) -> Self {
        Self {
            sink_url,
            sample_rx,
        }
    }

    /// Run until the sample channel closes (the listener went away).
    pub async fn run(mut self) {
        debug!("starting forwarder for {}", self.sink_url);

        while let Some(sample) = self.sample_rx.recv().await {
            if let Err(e) = forward(&self.sink_url, &sample).await {
                warn!("dropping sample (value={}): {e:#}", sample.value);
            }
        }

        debug!("sample channel closed, forwarder stopping");
    }
}

/// Push one sample to the sink over a fresh connection.
///
/// The connection never outlives this call; it is closed on every exit path
/// when the socket is dropped.
pub async fn forward(sink_url: &str, sample: &MetricSample) -> Result<()> {
    trace!("connecting to sink at {sink_url}");

    let (mut ws, _) = connect_async(sink_url)
        .await
        .with_context(|| format!("failed to connect to sink at {sink_url}"))?;

    let frame = StreamFrame::from(sample);
    let text = serde_json::to_string(&frame).context("failed to serialize frame")?;

    ws.send(Message::Text(text))
        .await
        .context("failed to send frame to sink")?;

    // Best-effort close handshake; the socket is gone either way.
    ws.close(None).await.ok();

    info!("pushed sample to sink: value={}", sample.value);

    Ok(())
}
