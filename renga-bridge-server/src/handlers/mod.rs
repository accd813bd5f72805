//! Handlers for the built-in commands.

mod get_walls;
mod update_points;

pub use get_walls::{baseline_from_curve, GetWallsHandler};
pub use update_points::UpdatePointsHandler;
