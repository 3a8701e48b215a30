//! Test helpers shared by the integration tests

use futures::StreamExt;
use livebridge::forward::StreamFrame;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Bind a local websocket sink that relays every received text frame.
///
/// Returns the sink URL and a receiver yielding frames in arrival order.
pub async fn spawn_sink() -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let frame_tx = frame_tx.clone();

            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        let _ = frame_tx.send(text);
                    }
                }
            });
        }
    });

    (url, frame_rx)
}

/// Receive the next frame from the sink, failing the test after a timeout.
pub async fn recv_frame(frames: &mut mpsc::UnboundedReceiver<String>) -> StreamFrame {
    let text = tokio::time::timeout(std::time::Duration::from_secs(5), frames.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("sink channel closed");

    serde_json::from_str(&text).expect("sink received a malformed frame")
}

/// Build a notification payload for a numeric value.
pub fn payload(timestamp: &str, value: f64) -> String {
    format!(r#"{{"timestamp":"{timestamp}","value":{value}}}"#)
}
