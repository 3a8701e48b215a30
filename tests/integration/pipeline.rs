//! End-to-end tests of the dispatch → channel → forwarder pipeline.
//!
//! These tests exercise everything downstream of the Postgres connection:
//! payload dispatch with both decode-error policies, the bounded sample
//! channel, and the forwarder pushing frames to a real websocket sink.

use livebridge::config::DecodeErrorPolicy;
use livebridge::forward::{SAMPLE_BUFFER, StreamForwarder};
use livebridge::listener::dispatch;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;

use crate::helpers::{payload, recv_frame, spawn_sink};

#[tokio::test]
async fn valid_payload_reaches_the_sink_as_one_frame() {
    let (sink_url, mut frames) = spawn_sink().await;
    let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_BUFFER);
    let forwarder = tokio::spawn(StreamForwarder::new(sink_url, sample_rx).run());

    dispatch(
        r#"{"timestamp":"2024-01-01T00:00:00Z","value":"42.5"}"#,
        DecodeErrorPolicy::Fail,
        &sample_tx,
    )
    .await
    .unwrap();
    drop(sample_tx);
    forwarder.await.unwrap();

    let frame = recv_frame(&mut frames).await;
    assert_eq!(
        serde_json::to_value(&frame).unwrap(),
        json!({
            "fields": [
                {"name": "time", "values": ["2024-01-01T00:00:00Z"]},
                {"name": "value", "values": [42.5]},
            ]
        })
    );
    assert!(frames.try_recv().is_err(), "exactly one frame expected");
}

#[tokio::test]
async fn burst_is_forwarded_completely_and_in_order() {
    let (sink_url, mut frames) = spawn_sink().await;
    let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_BUFFER);
    let forwarder = tokio::spawn(StreamForwarder::new(sink_url, sample_rx).run());

    // Everything queued before a wake-up is dispatched before the next wait.
    for value in [1.0, 2.0, 3.0] {
        dispatch(&payload("t", value), DecodeErrorPolicy::Fail, &sample_tx)
            .await
            .unwrap();
    }
    drop(sample_tx);
    forwarder.await.unwrap();

    for expected in [1.0, 2.0, 3.0] {
        let frame = recv_frame(&mut frames).await;
        assert_eq!(frame.fields[1].values, vec![json!(expected)]);
    }
}

#[tokio::test]
async fn malformed_payload_stops_dispatch_under_fail_policy() {
    let (sample_tx, mut sample_rx) = mpsc::channel(SAMPLE_BUFFER);

    let result = dispatch(r#"{"value":"42.5"}"#, DecodeErrorPolicy::Fail, &sample_tx).await;

    assert!(result.is_err());
    assert!(
        sample_rx.try_recv().is_err(),
        "no sample may leave a failed dispatch"
    );
}

#[tokio::test]
async fn malformed_payload_is_skipped_under_skip_policy() {
    let (sink_url, mut frames) = spawn_sink().await;
    let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_BUFFER);
    let forwarder = tokio::spawn(StreamForwarder::new(sink_url, sample_rx).run());

    dispatch("not json", DecodeErrorPolicy::Skip, &sample_tx)
        .await
        .unwrap();
    dispatch(&payload("t", 2.0), DecodeErrorPolicy::Skip, &sample_tx)
        .await
        .unwrap();
    drop(sample_tx);
    forwarder.await.unwrap();

    let frame = recv_frame(&mut frames).await;
    assert_eq!(frame.fields[1].values, vec![json!(2.0)]);
    assert!(frames.try_recv().is_err());
}
