//! Bridge wire protocol.
//!
//! Messages are UTF-8 JSON documents carried in length-prefixed frames over
//! a TCP stream. One request and one response are exchanged per connection.

mod command;
pub mod constants;
mod frame;
pub mod geometry;
mod message;

pub use command::{
    GetWallsResponse, PointOutcome, PointUpsert, RawUpdatePoints, UpdatePointsRequest,
    UpdatePointsResponse,
};
pub use constants::*;
pub use frame::{encode_frame, read_frame, write_frame, FrameCodec};
pub use geometry::{Baseline, CurveSegment, MeshData, MeshGrid, Point3, WallInfo};
pub use message::{next_request_id, timestamp_now, Request, Response};
