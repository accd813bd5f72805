//! Protocol constants for the bridge wire format.

use std::time::Duration;

/// Size of the frame length field in bytes.
pub const SIZE_OF_FRAME_LENGTH_FIELD: usize = 4;

/// Largest payload accepted in a single frame (10 MiB).
pub const MAX_FRAME_LENGTH: usize = 10 * 1024 * 1024;

/// Default TCP port the plugin listens on.
pub const DEFAULT_PORT: u16 = 50100;

/// Lowest port accepted by configuration.
pub const MIN_PORT: u16 = 1024;

/// Default per-call connect and I/O timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for the reachability probe.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Column height used when a point carries no usable height (model units).
pub const DEFAULT_COLUMN_HEIGHT: f64 = 3000.0;

// Command names.

/// Create or update columns from a batch of points.
pub const UPDATE_POINTS: &str = "update_points";

/// Read wall geometry from the model.
pub const GET_WALLS: &str = "get_walls";
