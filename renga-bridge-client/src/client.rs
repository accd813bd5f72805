//! Bridge client entry point.

use std::sync::Arc;

use renga_bridge_core::protocol::{
    GetWallsResponse, Request, Response, UpdatePointsRequest, UpdatePointsResponse, WallInfo,
    GET_WALLS, MAX_PROBE_TIMEOUT, UPDATE_POINTS,
};
use renga_bridge_core::Result;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::instrument;

use crate::config::ClientConfig;
use crate::connection::Connection;

/// Sends commands to the Renga plugin.
///
/// Every call opens a fresh connection, writes one request, reads one
/// response and closes. The client holds no connection state, so clones are
/// cheap and independent.
///
/// # Example
///
/// ```ignore
/// use renga_bridge_client::{BridgeClient, ClientConfig};
///
/// let client = BridgeClient::new(ClientConfig::default());
/// if client.is_reachable().await {
///     let walls = client.get_walls().await?;
///     println!("{} walls", walls.len());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BridgeClient {
    config: Arc<ClientConfig>,
}

impl BridgeClient {
    /// Creates a client for the configured plugin address.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `request` and returns the plugin's response.
    ///
    /// Never fails: transport and decoding problems are reported as a
    /// response with `success == false`, the request's id and a description
    /// of the failure.
    pub async fn send(&self, request: &Request) -> Response {
        match self.try_send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    id = %request.id,
                    command = %request.command,
                    error = %e,
                    "request failed"
                );
                Response::failure(request.id.clone(), e.to_string())
            }
        }
    }

    /// Sends `request`, returning transport failures as errors.
    #[instrument(skip(self, request), fields(id = %request.id, command = %request.command))]
    pub async fn try_send(&self, request: &Request) -> Result<Response> {
        let address = self.config.address();
        let mut conn = Connection::connect(
            &address,
            self.config.connect_timeout(),
            self.config.io_timeout(),
        )
        .await?;

        let conn_id = conn.id();
        conn.send(request).await?;
        let response = conn.receive().await?;
        conn.close().await;

        if response.id != request.id {
            tracing::warn!(
                expected = %request.id,
                received = %response.id,
                "response id does not match request id"
            );
        }

        tracing::debug!(
            connection = %conn_id,
            success = response.success,
            "received response"
        );
        Ok(response)
    }

    /// Probes whether the plugin accepts connections.
    ///
    /// Connects and disconnects without sending anything. The probe gives
    /// up after the connect timeout or two seconds, whichever is shorter.
    pub async fn is_reachable(&self) -> bool {
        let probe_timeout = self.config.connect_timeout().min(MAX_PROBE_TIMEOUT);
        let address = self.config.address();

        match timeout(probe_timeout, TcpStream::connect(address.as_str())).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                tracing::debug!(address = %address, error = %e, "plugin not reachable");
                false
            }
            Err(_) => {
                tracing::debug!(address = %address, "reachability probe timed out");
                false
            }
        }
    }

    /// Creates or updates columns for `points`.
    ///
    /// A response with `success == false` is returned as
    /// [`BridgeError::Remote`](renga_bridge_core::BridgeError::Remote).
    pub async fn update_points(
        &self,
        points: &UpdatePointsRequest,
    ) -> Result<UpdatePointsResponse> {
        let request = Request::with_payload(UPDATE_POINTS, points)?;
        self.try_send(&request).await?.into_payload()
    }

    /// Reads all walls from the active model.
    pub async fn get_walls(&self) -> Result<Vec<WallInfo>> {
        let request = Request::new(GET_WALLS, json!({}));
        let response: GetWallsResponse = self.try_send(&request).await?.into_payload()?;
        Ok(response.walls)
    }
}

impl Default for BridgeClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
