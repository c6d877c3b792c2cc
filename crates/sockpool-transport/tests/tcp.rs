//! Round-trip tests for the length-delimited TCP transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use sockpool_transport::{Dialer, TcpDialer, TransportError};

/// Binds an ephemeral echo server and returns its address.
async fn spawn_echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
                while let Some(Ok(frame)) = framed.next().await {
                    if framed.send(frame.freeze()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    addr
}

#[tokio::test]
async fn text_round_trip() {
    let addr = spawn_echo_server().await;
    let mut conn = TcpDialer::new().dial(&addr).await.unwrap();

    conn.send_text("hello").await.unwrap();
    let reply = conn.recv().await.unwrap();
    assert_eq!(reply, Bytes::from_static(b"hello"));

    conn.close().await.unwrap();
}

#[tokio::test]
async fn json_round_trip() {
    let addr = spawn_echo_server().await;
    let mut conn = TcpDialer::new().dial(&addr).await.unwrap();

    let value = serde_json::json!({"op": "ping", "seq": 1});
    conn.send_json(&value).await.unwrap();

    let reply = conn.recv().await.unwrap();
    let decoded: serde_json::Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(decoded, value);
}

#[tokio::test]
async fn recv_reports_closed_when_server_hangs_up() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let mut conn = TcpDialer::new().dial(&addr).await.unwrap();
    let err = conn.recv().await.unwrap_err();
    assert!(matches!(err, TransportError::ConnectionClosed));
}

#[tokio::test]
async fn dial_fails_for_unreachable_target() {
    assert!(TcpDialer::new().dial("127.0.0.1:1").await.is_err());
}
