#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Integration tests against a local WebSocket hub.
//!
//! Covers the WebSocket sink on its own, the bridge with a scripted source
//! feeding a real hub, and the full path from a ZeroMQ publisher through
//! the bridge to the hub.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use zeromq::{Endpoint, Socket, SocketSend, ZmqMessage};

use iolo_bridge::sink::{RelaySink, SinkError, WebSocketSink};
use iolo_bridge::source::{SourceError, SubscriptionSource, ZmqSource};
use iolo_bridge::{Bridge, BridgeConfig, ExitStatus, ReconnectPolicy, ShutdownReason, SinkConfig};
use iolo_core::wire::signed_frame;
use iolo_core::{ConnectionDescriptor, RawFrame};

const WAIT: Duration = Duration::from_secs(5);

/// A hub that accepts up to `max_connections` clients and reports every text
/// message as `(connection index, text)`. With `drop_after`, the first
/// connection is dropped after that many messages.
async fn spawn_hub(
    max_connections: Option<usize>,
    drop_after: Option<usize>,
) -> (Url, mpsc::UnboundedReceiver<(usize, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("ws://{}/iopub", listener.local_addr().unwrap())).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut index = 0;
        while max_connections.is_none_or(|max| index < max) {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let tx = tx.clone();
            let limit = if index == 0 { drop_after } else { None };
            let connection = index;
            index += 1;

            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let mut received = 0;
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Text(text) = message {
                        let _ = tx.send((connection, text.as_str().to_owned()));
                        received += 1;
                        if limit == Some(received) {
                            return;
                        }
                    }
                }
            });
        }
    });

    (url, rx)
}

async fn next_message(rx: &mut mpsc::UnboundedReceiver<(usize, String)>) -> (usize, String) {
    timeout(WAIT, rx.recv()).await.unwrap().unwrap()
}

fn fast_config() -> SinkConfig {
    SinkConfig {
        send_timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(2),
        reconnect: ReconnectPolicy::immediate(),
        ..SinkConfig::default()
    }
}

fn descriptor(iopub_port: u16) -> ConnectionDescriptor {
    ConnectionDescriptor::from_json(&format!(
        r#"{{"transport":"tcp","ip":"127.0.0.1","shell_port":5554,"iopub_port":{iopub_port},
            "stdin_port":5556,"control_port":5557,"hb_port":5558,
            "key":"abc","signature_scheme":"hmac-sha256","kernel_name":"python3"}}"#
    ))
    .unwrap()
}

fn stream_frame(desc: &ConnectionDescriptor, identity: &[u8], text: &str) -> RawFrame {
    let content = json!({ "name": "stdout", "text": text }).to_string();
    signed_frame(
        desc,
        &[identity.to_vec()],
        [br#"{"msg_type":"stream"}"#, b"{}", b"{}", content.as_bytes()],
        vec![],
    )
}

/// Yields its frames with a pause before each one, then closes.
struct PacedSource {
    frames: VecDeque<RawFrame>,
    pause: Duration,
}

impl SubscriptionSource for PacedSource {
    async fn next(&mut self) -> Result<RawFrame, SourceError> {
        sleep(self.pause).await;
        self.frames.pop_front().ok_or(SourceError::Closed)
    }
}

// =========================================================================
// WebSocket sink
// =========================================================================

#[tokio::test]
async fn sink_delivers_text_messages_in_order() {
    let (url, mut rx) = spawn_hub(None, None).await;
    let mut sink = WebSocketSink::open(&url, fast_config()).await.unwrap();
    assert!(sink.is_connected());

    for doc in ["one", "two", "three"] {
        sink.send(doc).await.unwrap();
    }
    assert_eq!(next_message(&mut rx).await, (0, "one".to_owned()));
    assert_eq!(next_message(&mut rx).await, (0, "two".to_owned()));
    assert_eq!(next_message(&mut rx).await, (0, "three".to_owned()));

    sink.close().await;
    assert!(!sink.is_connected());
}

#[tokio::test]
async fn sink_rejects_oversized_documents_without_dropping_the_connection() {
    let (url, mut rx) = spawn_hub(None, None).await;
    let config = SinkConfig {
        max_message_bytes: 8,
        ..fast_config()
    };
    let mut sink = WebSocketSink::open(&url, config).await.unwrap();

    let err = sink.send("0123456789").await.unwrap_err();
    assert_eq!(err, SinkError::MessageTooLarge { size: 10, max: 8 });
    assert!(!err.is_connection_failure());
    assert!(sink.is_connected());

    sink.send("small").await.unwrap();
    assert_eq!(next_message(&mut rx).await, (0, "small".to_owned()));
}

#[tokio::test]
async fn sink_open_fails_when_nothing_listens() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = Url::parse(&format!("ws://127.0.0.1:{port}/iopub")).unwrap();

    let result = WebSocketSink::open(&url, fast_config()).await;
    assert!(matches!(result, Err(SinkError::Connect(_))));
}

#[tokio::test]
async fn sink_redials_after_the_hub_drops_it() {
    let (url, mut rx) = spawn_hub(None, Some(1)).await;
    let mut sink = WebSocketSink::open(&url, fast_config()).await.unwrap();

    sink.send("first").await.unwrap();
    assert_eq!(next_message(&mut rx).await, (0, "first".to_owned()));

    let mut failures = 0;
    let mut resumed = false;
    for i in 0..100 {
        sleep(Duration::from_millis(20)).await;
        match sink.send(&format!("m{i}")).await {
            Ok(()) => {}
            Err(e) => {
                assert!(matches!(e, SinkError::Write(_)), "unexpected {e:?}");
                assert!(!sink.is_connected());
                failures += 1;
            }
        }
        if let Ok((connection, _)) = rx.try_recv() {
            if connection == 1 {
                resumed = true;
                break;
            }
        }
    }

    assert!(failures >= 1, "a write to the dropped connection must fail");
    assert!(resumed, "documents must flow over a new connection");
    assert!(sink.is_connected());
}

// =========================================================================
// Bridge with a real hub
// =========================================================================

#[tokio::test]
async fn bridge_relays_one_stream_notification() {
    let (url, mut rx) = spawn_hub(None, None).await;
    let desc = descriptor(5555);
    let source = PacedSource {
        frames: VecDeque::from([stream_frame(&desc, b"stream", "hi")]),
        pause: Duration::ZERO,
    };

    let bridge = Bridge::connect(
        desc,
        BridgeConfig::default(),
        WebSocketSink::open(&url, fast_config()),
        async { Ok(source) },
    )
    .await
    .unwrap();
    let report = bridge.run().await;

    assert_eq!(report.exit_status(), ExitStatus::Success);
    assert_eq!(report.stats.forwarded, 1);

    let (_, text) = next_message(&mut rx).await;
    let document: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        document,
        json!({
            "header": {"msg_type": "stream"},
            "parent_header": {},
            "metadata": {},
            "content": {"name": "stdout", "text": "hi"},
            "buffers": []
        })
    );
    assert!(
        timeout(Duration::from_millis(200), rx.recv()).await.is_err(),
        "exactly one document expected"
    );
}

#[tokio::test]
async fn bridge_exits_when_the_hub_stays_down() {
    // One connection only, dropped after the first message; re-dials are refused.
    let (url, mut rx) = spawn_hub(Some(1), Some(1)).await;
    let desc = descriptor(5555);
    let frames = (0..50)
        .map(|i| stream_frame(&desc, b"stream", &format!("line {i}")))
        .collect();
    let source = PacedSource {
        frames,
        pause: Duration::from_millis(20),
    };

    let bridge = Bridge::connect(
        desc,
        BridgeConfig::default(),
        WebSocketSink::open(&url, fast_config()),
        async { Ok(source) },
    )
    .await
    .unwrap();
    let report = timeout(Duration::from_secs(10), bridge.run()).await.unwrap();

    assert_eq!(
        report.reason,
        ShutdownReason::SustainedSinkFailure { failures: 3 }
    );
    assert_eq!(report.exit_status(), ExitStatus::SustainedOutboundFailure);
    assert!(report.stats.received < 50);
    assert_eq!(next_message(&mut rx).await.0, 0);
}

// =========================================================================
// ZeroMQ publisher → bridge → hub
// =========================================================================

fn zmq_message(frame: RawFrame) -> ZmqMessage {
    let mut parts = frame.into_parts().into_iter();
    let mut message = ZmqMessage::from(parts.next().unwrap());
    for part in parts {
        message.push_back(part.into());
    }
    message
}

/// Bind a kernel-side PUB socket and write a connection file pointing at it.
async fn bind_publisher() -> (zeromq::PubSocket, ConnectionDescriptor, tempfile::TempDir) {
    let mut publisher = zeromq::PubSocket::new();
    let port = match publisher.bind("tcp://127.0.0.1:0").await.unwrap() {
        Endpoint::Tcp(_, port) => port,
        other => panic!("unexpected endpoint {other:?}"),
    };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernel-test.json");
    std::fs::write(
        &path,
        format!(
            r#"{{"transport":"tcp","ip":"127.0.0.1","shell_port":1,"iopub_port":{port},
                "stdin_port":2,"control_port":3,"hb_port":4,
                "key":"abc","signature_scheme":"hmac-sha256"}}"#
        ),
    )
    .unwrap();
    let desc = ConnectionDescriptor::parse(&path).unwrap();
    (publisher, desc, dir)
}

#[tokio::test]
async fn iopub_publisher_reaches_the_hub() {
    let (url, mut rx) = spawn_hub(None, None).await;
    let (mut publisher, desc, _dir) = bind_publisher().await;
    let iopub = desc.iopub_address();
    let frame = stream_frame(&desc, b"kernel.test.stream", "hi");

    let bridge = Bridge::connect(
        desc,
        BridgeConfig::default(),
        WebSocketSink::open(&url, fast_config()),
        ZmqSource::open(&iopub, ""),
    )
    .await
    .unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let running = tokio::spawn(bridge.run_until(async {
        let _ = stop_rx.await;
    }));

    // Subscriptions propagate asynchronously; publish until one arrives.
    let publishing = tokio::spawn(async move {
        loop {
            publisher.send(zmq_message(frame.clone())).await.unwrap();
            sleep(Duration::from_millis(50)).await;
        }
    });

    let (_, text) = next_message(&mut rx).await;
    publishing.abort();
    let document: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(document["header"]["msg_type"], "stream");
    assert_eq!(document["content"]["text"], "hi");
    assert_eq!(document["buffers"], json!([]));

    stop_tx.send(()).unwrap();
    let report = timeout(WAIT, running).await.unwrap().unwrap();
    assert_eq!(report.reason, ShutdownReason::Signal);
    assert!(report.stats.forwarded >= 1);
    assert_eq!(report.stats.dropped_decode, 0);
}

#[tokio::test]
async fn bridge_closes_cleanly_when_the_kernel_goes_away() {
    let (url, mut rx) = spawn_hub(None, None).await;
    let (mut publisher, desc, _dir) = bind_publisher().await;
    let iopub = desc.iopub_address();
    let frame = stream_frame(&desc, b"kernel.test.stream", "bye");

    let bridge = Bridge::connect(
        desc,
        BridgeConfig::default(),
        WebSocketSink::open(&url, fast_config()),
        ZmqSource::open(&iopub, ""),
    )
    .await
    .unwrap();
    let running = tokio::spawn(bridge.run());

    // Publish until the subscription is live and a document reaches the hub.
    timeout(WAIT, async {
        loop {
            publisher.send(zmq_message(frame.clone())).await.unwrap();
            if let Ok(Some(_)) = timeout(Duration::from_millis(50), rx.recv()).await {
                break;
            }
        }
    })
    .await
    .unwrap();

    publisher.close().await;

    let report = timeout(WAIT, running).await.unwrap().unwrap();
    assert_eq!(report.reason, ShutdownReason::SourceClosed);
    assert_eq!(report.exit_status(), ExitStatus::Success);
    assert!(report.stats.forwarded >= 1);
}
