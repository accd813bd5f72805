//! Common test utilities for client integration tests.

#![allow(dead_code)]

use std::time::Duration;

use renga_bridge_client::{BridgeClient, ClientConfigBuilder};
use renga_bridge_core::protocol::{read_frame, write_frame, Request};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the fake plugin writes back for one request.
pub enum Reply {
    /// A well-formed frame around these bytes.
    Frame(Vec<u8>),
    /// Raw bytes written as-is.
    Raw(Vec<u8>),
    /// Close without answering.
    Close,
}

/// Starts a fake plugin answering `connections` requests with `reply`.
///
/// Returns the bound port and a handle yielding the requests received.
pub async fn spawn_fake_plugin<F>(connections: usize, reply: F) -> (u16, JoinHandle<Vec<Request>>)
where
    F: Fn(&Request) -> Reply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind fake plugin");
    let port = listener.local_addr().expect("no local addr").port();

    let handle = tokio::spawn(async move {
        let mut received = Vec::new();
        for _ in 0..connections {
            let (mut stream, _) = listener.accept().await.expect("accept failed");
            let frame = read_frame(&mut stream).await.expect("failed to read request");
            let request = Request::from_slice(&frame).expect("invalid request");

            match reply(&request) {
                Reply::Frame(bytes) => {
                    write_frame(&mut stream, &bytes).await.expect("write failed");
                }
                Reply::Raw(bytes) => {
                    stream.write_all(&bytes).await.expect("write failed");
                }
                Reply::Close => {}
            }
            let _ = stream.shutdown().await;
            received.push(request);
        }
        received
    });

    (port, handle)
}

pub fn client_for(port: u16) -> BridgeClient {
    BridgeClient::new(
        ClientConfigBuilder::new()
            .port(port)
            .connect_timeout(Duration::from_secs(1))
            .io_timeout(Duration::from_secs(2))
            .build()
            .expect("failed to build config"),
    )
}
