//! TCP listener serving one request per connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use renga_bridge_core::protocol::{read_frame, write_frame, Request, Response};
use renga_bridge_core::{BridgeError, Result};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::instrument;

use crate::config::ServerConfig;
use crate::identity::IdentityMap;
use crate::router::CommandRouter;
use crate::store::ModelStore;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The plugin-side bridge server.
///
/// Each accepted connection is handled on its own task: read one request
/// frame, route it, write one response frame, close.
#[derive(Debug)]
pub struct BridgeServer {
    config: ServerConfig,
    router: Arc<CommandRouter>,
}

impl BridgeServer {
    /// Creates a server dispatching through `router`.
    pub fn new(config: ServerConfig, router: CommandRouter) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// Creates a server with the built-in commands over `store`.
    pub fn with_store(config: ServerConfig, store: Arc<dyn ModelStore>) -> Self {
        let router = CommandRouter::with_default_handlers(
            store,
            Arc::new(IdentityMap::new()),
            config.default_column_height(),
        );
        Self::new(config, router)
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the configured address and starts serving.
    pub async fn bind(self) -> Result<RunningServer> {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            BridgeError::Connection(format!("failed to bind {}: {}", address, e))
        })?;
        self.serve(listener)
    }

    /// Starts serving on an already-bound listener.
    pub fn serve(self, listener: TcpListener) -> Result<RunningServer> {
        let local_addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = watch::channel(false);

        tracing::info!(
            address = %local_addr,
            commands = ?self.router.commands(),
            "bridge server listening"
        );

        let task = tokio::spawn(accept_loop(
            listener,
            self.router,
            self.config.read_timeout(),
            self.config.write_timeout(),
            shutdown_rx,
        ));

        Ok(RunningServer {
            local_addr,
            shutdown,
            task,
        })
    }
}

/// Handle to a server started with [`BridgeServer::bind`] or [`BridgeServer::serve`].
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RunningServer {
    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the bound port.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stops accepting connections and waits for the accept loop to end.
    ///
    /// Connections already accepted finish on their own tasks.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "accept loop terminated abnormally");
        }
        tracing::info!(address = %self.local_addr, "bridge server stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: Arc<CommandRouter>,
    read_timeout: Duration,
    write_timeout: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let router = Arc::clone(&router);
                    tokio::spawn(handle_connection(
                        stream,
                        peer,
                        router,
                        read_timeout,
                        write_timeout,
                    ));
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

#[instrument(name = "bridge_server.connection", skip_all, fields(peer = %peer))]
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    router: Arc<CommandRouter>,
    read_timeout: Duration,
    write_timeout: Duration,
) {
    let response = match timeout(read_timeout, read_frame(&mut stream)).await {
        Err(_) => {
            tracing::warn!(timeout = ?read_timeout, "no request before read timeout");
            Some(Response::failure(
                "",
                BridgeError::Timeout(format!("no request within {:?}", read_timeout)).to_string(),
            ))
        }
        Ok(Err(BridgeError::ConnectionClosed(reason))) => {
            tracing::debug!(reason = %reason, "peer closed before sending a request");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to read request frame");
            Some(Response::failure("", e.to_string()))
        }
        Ok(Ok(frame)) => Some(dispatch(router, &frame).await),
    };

    if let Some(response) = response {
        if let Err(e) = send_response(&mut stream, &response, write_timeout).await {
            tracing::debug!(error = %e, "failed to write response");
        }
    }

    let _ = stream.shutdown().await;
}

async fn dispatch(router: Arc<CommandRouter>, frame: &[u8]) -> Response {
    let request = match Request::from_slice(frame) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable request");
            return Response::failure(recover_id(frame), e.to_string());
        }
    };

    tracing::debug!(id = %request.id, command = %request.command, "request received");
    let id = request.id.clone();

    match tokio::task::spawn_blocking(move || router.route(&request)).await {
        Ok(response) => response,
        Err(e) => Response::failure(id, format!("handler task failed: {}", e)),
    }
}

/// Best-effort extraction of the `id` field from a request that failed to decode.
fn recover_id(frame: &[u8]) -> String {
    serde_json::from_slice::<Value>(frame)
        .ok()
        .and_then(|v| v.get("id").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

async fn send_response(
    stream: &mut TcpStream,
    response: &Response,
    write_timeout: Duration,
) -> Result<()> {
    let payload = response.to_bytes()?;
    timeout(write_timeout, write_frame(stream, &payload))
        .await
        .map_err(|_| BridgeError::Timeout(format!("write timed out after {:?}", write_timeout)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_id() {
        assert_eq!(recover_id(br#"{"id":"abc","data":{}}"#), "abc");
        assert_eq!(recover_id(br#"{"id":42}"#), "");
        assert_eq!(recover_id(b"not json"), "");
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = BridgeServer::new(ServerConfig::default(), CommandRouter::new())
            .serve(listener)
            .unwrap();
        let address = server.local_addr();

        assert!(TcpStream::connect(address).await.is_ok());
        server.shutdown().await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(TcpStream::connect(address).await.is_err());
    }
}
