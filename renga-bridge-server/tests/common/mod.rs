//! Common test utilities for server integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use renga_bridge_client::{BridgeClient, ClientConfigBuilder};
use renga_bridge_core::protocol::{encode_frame, read_frame, Response};
use renga_bridge_server::store::InMemoryModelStore;
use renga_bridge_server::{BridgeServer, RunningServer, ServerConfig};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

/// A running server over an in-memory model.
pub struct TestServer {
    pub server: RunningServer,
    pub store: Arc<InMemoryModelStore>,
}

impl TestServer {
    pub fn port(&self) -> u16 {
        self.server.port()
    }

    pub fn client(&self) -> BridgeClient {
        BridgeClient::new(
            ClientConfigBuilder::new()
                .port(self.port())
                .connect_timeout(Duration::from_secs(1))
                .io_timeout(Duration::from_secs(5))
                .build()
                .expect("failed to build client config"),
        )
    }
}

/// Starts a server on an ephemeral port with an empty model.
pub async fn start_server() -> TestServer {
    start_server_with(ServerConfig::default()).await
}

/// Starts a server on an ephemeral port using `config` for timeouts and defaults.
pub async fn start_server_with(config: ServerConfig) -> TestServer {
    let store = Arc::new(InMemoryModelStore::new());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test server");
    let server = BridgeServer::with_store(config, store.clone())
        .serve(listener)
        .expect("failed to start test server");
    TestServer { server, store }
}

/// Writes `bytes` as-is on a fresh connection and reads one response frame.
pub async fn exchange_raw(port: u16, bytes: &[u8]) -> Response {
    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("failed to connect");
    stream.write_all(bytes).await.expect("write failed");
    let frame = read_frame(&mut stream).await.expect("no response frame");
    Response::from_slice(&frame).expect("invalid response")
}

/// Sends `payload` in a well-formed frame and reads one response.
pub async fn exchange_payload(port: u16, payload: &[u8]) -> Response {
    let frame = encode_frame(payload).expect("failed to encode frame");
    exchange_raw(port, &frame).await
}
