//! Request builders for the bridge commands.

use renga_bridge_core::protocol::{
    Point3, PointUpsert, Request, UpdatePointsRequest, UpdatePointsResponse,
    DEFAULT_COLUMN_HEIGHT, GET_WALLS, UPDATE_POINTS,
};
use renga_bridge_core::Result;
use serde_json::json;

/// Per-axis distance under which two points are treated as the same point.
pub const POINT_TOLERANCE: f64 = 0.001;

/// Returns the height for point `index`.
///
/// Uses `heights[index]` when present, otherwise the last height given,
/// otherwise [`DEFAULT_COLUMN_HEIGHT`].
pub fn height_for(heights: &[f64], index: usize) -> f64 {
    heights
        .get(index)
        .or_else(|| heights.last())
        .copied()
        .unwrap_or(DEFAULT_COLUMN_HEIGHT)
}

#[derive(Debug, Clone)]
struct TrackedPoint {
    position: Point3,
    client_id: String,
    column_id: Option<String>,
}

/// Assigns stable client identities to points across batches.
///
/// A point within [`POINT_TOLERANCE`] of a previously seen point reuses that
/// point's identity, and the column id reported for it is sent back as the
/// entity hint.
#[derive(Debug, Clone, Default)]
pub struct PointIdentityTracker {
    points: Vec<TrackedPoint>,
    counter: u64,
}

impl PointIdentityTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tracked points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no points are tracked.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Forgets every tracked point.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Returns the identity for `position`, assigning a new one if needed.
    pub fn identify(&mut self, position: Point3) -> String {
        if let Some(tracked) = self.find(position) {
            return tracked.client_id.clone();
        }

        self.counter += 1;
        let client_id = format!(
            "GH_Point_{}_{}",
            self.counter,
            uuid::Uuid::new_v4().simple()
        );
        self.points.push(TrackedPoint {
            position,
            client_id: client_id.clone(),
            column_id: None,
        });
        client_id
    }

    /// Returns the column id last reported for `client_id`.
    pub fn column_id(&self, client_id: &str) -> Option<&str> {
        self.points
            .iter()
            .find(|p| p.client_id == client_id)
            .and_then(|p| p.column_id.as_deref())
    }

    /// Builds an `update_points` body for `positions`.
    ///
    /// Heights are broadcast with [`height_for`].
    pub fn build_request(&mut self, positions: &[Point3], heights: &[f64]) -> UpdatePointsRequest {
        let points = positions
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let client_id = self.identify(*position);
                PointUpsert {
                    height: Some(height_for(heights, i)),
                    renga_column_guid: self.column_id(&client_id).map(str::to_string),
                    grasshopper_guid: Some(client_id),
                    ..PointUpsert::at(*position)
                }
            })
            .collect();

        UpdatePointsRequest { points }
    }

    /// Stores the column ids reported in `response`.
    ///
    /// Returns how many identities were updated.
    pub fn record_results(&mut self, response: &UpdatePointsResponse) -> usize {
        let mut updated = 0;
        for outcome in response.results.iter().filter(|r| r.success) {
            let (Some(client_id), Some(column_id)) = (&outcome.grasshopper_guid, &outcome.column_id)
            else {
                continue;
            };

            if let Some(tracked) = self.points.iter_mut().find(|p| &p.client_id == client_id) {
                tracked.column_id = Some(column_id.clone());
                updated += 1;
            }
        }
        updated
    }

    fn find(&self, position: Point3) -> Option<&TrackedPoint> {
        self.points
            .iter()
            .find(|p| p.position.approx_eq(&position, POINT_TOLERANCE))
    }
}

/// Builds an `update_points` request.
pub fn update_points_request(body: &UpdatePointsRequest) -> Result<Request> {
    Request::with_payload(UPDATE_POINTS, body)
}

/// Builds a `get_walls` request.
pub fn get_walls_request() -> Request {
    Request::new(GET_WALLS, json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use renga_bridge_core::protocol::PointOutcome;

    #[test]
    fn test_height_broadcasting() {
        assert_eq!(height_for(&[2500.0, 2800.0], 0), 2500.0);
        assert_eq!(height_for(&[2500.0, 2800.0], 1), 2800.0);
        assert_eq!(height_for(&[2500.0, 2800.0], 5), 2800.0);
        assert_eq!(height_for(&[], 0), 3000.0);
    }

    #[test]
    fn test_identity_reused_within_tolerance() {
        let mut tracker = PointIdentityTracker::new();
        let a = tracker.identify(Point3::new(1000.0, 0.0, 0.0));
        let b = tracker.identify(Point3::new(1000.0005, 0.0, 0.0));
        let c = tracker.identify(Point3::new(1000.01, 0.0, 0.0));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_identity_format() {
        let mut tracker = PointIdentityTracker::new();
        let first = tracker.identify(Point3::ORIGIN);
        let second = tracker.identify(Point3::new(1.0, 1.0, 1.0));

        assert!(first.starts_with("GH_Point_1_"));
        assert!(second.starts_with("GH_Point_2_"));
        assert_eq!(first.len(), "GH_Point_1_".len() + 32);
    }

    #[test]
    fn test_build_request_sends_recorded_column_ids() {
        let mut tracker = PointIdentityTracker::new();
        let positions = [Point3::ORIGIN, Point3::new(5000.0, 0.0, 0.0)];

        let first = tracker.build_request(&positions, &[2700.0]);
        assert_eq!(first.points.len(), 2);
        assert!(first.points.iter().all(|p| p.renga_column_guid.is_none()));
        assert!(first.points.iter().all(|p| p.height == Some(2700.0)));

        let response = UpdatePointsResponse {
            results: vec![
                PointOutcome::ok("Column created", "11", first.points[0].grasshopper_guid.clone()),
                PointOutcome::failed(
                    "Error creating column: boom",
                    first.points[1].grasshopper_guid.clone(),
                ),
            ],
        };
        assert_eq!(tracker.record_results(&response), 1);

        let second = tracker.build_request(&positions, &[]);
        assert_eq!(second.points[0].grasshopper_guid, first.points[0].grasshopper_guid);
        assert_eq!(second.points[0].renga_column_guid.as_deref(), Some("11"));
        assert_eq!(second.points[1].renga_column_guid, None);
        assert_eq!(second.points[1].height, Some(3000.0));
    }

    #[test]
    fn test_request_builders() {
        let walls = get_walls_request();
        assert_eq!(walls.command, "get_walls");
        assert_eq!(walls.data, json!({}));

        let body = UpdatePointsRequest {
            points: vec![PointUpsert::at(Point3::new(1.0, 2.0, 3.0))],
        };
        let request = update_points_request(&body).unwrap();
        assert_eq!(request.command, "update_points");
        assert_eq!(request.data["points"][0]["y"], 2.0);
    }
}
