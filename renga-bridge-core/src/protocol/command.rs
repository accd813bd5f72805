//! Typed payloads for the bridge commands.
//!
//! Point data arrives from a scripting host and is loosely typed: identity
//! fields may be sent as strings, numbers or booleans, and coordinates may be
//! missing or null. The deserializers here normalize those shapes instead of
//! rejecting them.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::geometry::{Point3, WallInfo};

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn number_from(value: Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("number out of range: {}", n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("expected a number, found \"{}\"", s)),
        other => Err(format!("expected a number, found {}", other)),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(value).map_err(de::Error::custom)?.unwrap_or(0.0))
}

/// Like [`lenient_f64`] but optional, and never fails: a value that is not
/// a number becomes NaN so the consumer can substitute its own default.
fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None => None,
        Some(value) => number_from(value).unwrap_or(Some(f64::NAN)),
    })
}

/// One point in an `update_points` batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointUpsert {
    /// X coordinate (0 when missing).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub x: f64,
    /// Y coordinate (0 when missing).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub y: f64,
    /// Z coordinate (0 when missing).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub z: f64,
    /// Requested column height; the server default applies when absent.
    /// A value that is not a number reads as NaN.
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub height: Option<f64>,
    /// Stable identity assigned by the client.
    #[serde(default, deserialize_with = "loose_string")]
    pub grasshopper_guid: Option<String>,
    /// Host entity id the client believes is linked to this point.
    #[serde(default, deserialize_with = "loose_string")]
    pub renga_column_guid: Option<String>,
}

impl PointUpsert {
    /// Creates a point without a height or identities.
    pub fn at(position: Point3) -> Self {
        Self {
            x: position.x,
            y: position.y,
            z: position.z,
            ..Default::default()
        }
    }

    /// Position of the point.
    pub fn position(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }

    /// The client identity, if present and non-empty.
    pub fn client_id(&self) -> Option<&str> {
        non_empty(self.grasshopper_guid.as_deref())
    }

    /// The entity hint, if present and non-empty.
    pub fn entity_hint(&self) -> Option<&str> {
        non_empty(self.renga_column_guid.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Body of an `update_points` request as sent by clients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdatePointsRequest {
    /// Points in the order their outcomes should be reported.
    #[serde(default)]
    pub points: Vec<PointUpsert>,
}

/// Body of an `update_points` request as received by the server.
///
/// Points are kept as raw JSON so that one malformed entry fails on its own
/// instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RawUpdatePoints {
    /// Unparsed point objects.
    #[serde(default)]
    pub points: Option<Vec<Value>>,
}

/// Result for a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOutcome {
    /// Whether the column was created or updated.
    pub success: bool,
    /// Short human-readable outcome.
    pub message: String,
    /// Id of the affected column, when known.
    #[serde(default)]
    pub column_id: Option<String>,
    /// Client identity echoed from the request.
    #[serde(default)]
    pub grasshopper_guid: Option<String>,
}

impl PointOutcome {
    /// A successful outcome for `column_id`.
    pub fn ok(
        message: impl Into<String>,
        column_id: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            column_id: Some(column_id.into()),
            grasshopper_guid: client_id,
        }
    }

    /// A failed outcome.
    pub fn failed(message: impl Into<String>, client_id: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            column_id: None,
            grasshopper_guid: client_id,
        }
    }
}

/// Result body of `update_points`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdatePointsResponse {
    /// One outcome per input point, in input order.
    pub results: Vec<PointOutcome>,
}

/// Result body of `get_walls`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetWallsResponse {
    /// Walls present in the active model.
    pub walls: Vec<WallInfo>,
}
