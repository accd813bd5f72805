//! Request and response envelopes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Generates a fresh correlation id for a request.
///
/// Ids are UUID v4 in the 32-character hex form, unique per call.
pub fn next_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Returns the current UTC time as `YYYY-MM-DDTHH:MM:SS.fffZ`.
pub fn timestamp_now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A command sent from the client to the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation token, echoed verbatim in the response.
    #[serde(default)]
    pub id: String,
    /// Command name used by the router.
    pub command: String,
    /// Command payload.
    #[serde(default = "empty_object")]
    pub data: Value,
    /// Creation time of the request.
    #[serde(default)]
    pub timestamp: String,
}

impl Request {
    /// Creates a request for `command` with a fresh id and timestamp.
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        Self {
            id: next_request_id(),
            command: command.into(),
            data,
            timestamp: timestamp_now(),
        }
    }

    /// Creates a request whose payload is serialized from `data`.
    pub fn with_payload<T: Serialize>(command: impl Into<String>, data: &T) -> Result<Self> {
        Ok(Self::new(command, serde_json::to_value(data)?))
    }

    /// Deserializes the payload into a typed command body.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            BridgeError::Serialization(format!("invalid {} payload: {}", self.command, e))
        })
    }

    /// Serializes this request to JSON bytes.
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parses a request from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| BridgeError::Serialization(format!("invalid request: {}", e)))
    }
}

/// The plugin's answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the request this response answers.
    #[serde(default)]
    pub id: String,
    /// Whether the command succeeded.
    pub success: bool,
    /// Command result, present on success.
    #[serde(default)]
    pub data: Option<Value>,
    /// Human-readable failure description, present on failure.
    #[serde(default)]
    pub error: Option<String>,
    /// Creation time of the response.
    #[serde(default)]
    pub timestamp: String,
}

impl Response {
    /// Creates a successful response carrying `data`.
    pub fn success(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            data: Some(data),
            error: None,
            timestamp: timestamp_now(),
        }
    }

    /// Creates a failed response carrying `error`.
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: timestamp_now(),
        }
    }

    /// Deserializes the data payload into a typed result.
    ///
    /// A failed response is returned as [`BridgeError::Remote`].
    pub fn into_payload<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        if !self.success {
            return Err(BridgeError::Remote(
                self.error.unwrap_or_else(|| "request failed".to_string()),
            ));
        }

        let data = self.data.unwrap_or(Value::Null);
        serde_json::from_value(data)
            .map_err(|e| BridgeError::Serialization(format!("invalid response payload: {}", e)))
    }

    /// Serializes this response to JSON bytes.
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parses a response from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| BridgeError::Serialization(format!("invalid response: {}", e)))
    }
}
