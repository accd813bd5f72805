//! Geometry types carried in `get_walls` responses.

use serde::{Deserialize, Serialize};

/// Curve type name for straight segments.
pub const CURVE_LINE_SEGMENT: &str = "LineSegment";
/// Curve type name for circular arcs.
pub const CURVE_ARC: &str = "Arc";
/// Curve type name for chains of segments.
pub const CURVE_POLY_CURVE: &str = "PolyCurve";

/// A point in model coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3 {
    /// Creates a point from its coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The model origin.
    pub const ORIGIN: Point3 = Point3::new(0.0, 0.0, 0.0);

    /// Returns true if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Returns true if `other` lies within `tolerance` on every axis.
    pub fn approx_eq(&self, other: &Point3, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance
            && (self.y - other.y).abs() < tolerance
            && (self.z - other.z).abs() < tolerance
    }
}

/// One piece of a baseline curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveSegment {
    /// Curve type name, e.g. [`CURVE_LINE_SEGMENT`] or [`CURVE_ARC`].
    #[serde(rename = "type")]
    pub curve_type: String,
    /// First point of the segment.
    pub start_point: Point3,
    /// Last point of the segment.
    pub end_point: Point3,
    /// Arc center, for arcs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point3>,
    /// Arc radius, for arcs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// Description of a wall's baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    /// Curve type name of the whole baseline.
    #[serde(rename = "type")]
    pub curve_type: String,
    /// First point of the curve.
    pub start_point: Option<Point3>,
    /// Last point of the curve.
    pub end_point: Option<Point3>,
    /// Constituent segments; a single entry for simple curves.
    #[serde(default)]
    pub segments: Vec<CurveSegment>,
    /// Arc center, when the whole baseline is an arc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point3>,
    /// Arc radius, when the whole baseline is an arc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// A triangulated surface patch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshGrid {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Vertex index triples.
    pub triangles: Vec<[u32; 3]>,
}

/// A mesh made of one or more grids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    /// Grids composing this mesh.
    pub grids: Vec<MeshGrid>,
}

/// A wall as reported by `get_walls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallInfo {
    /// Host entity id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Placement origin, if readable.
    #[serde(default)]
    pub position: Option<Point3>,
    /// Wall height parameter (0 when unavailable).
    #[serde(default)]
    pub height: f64,
    /// Wall thickness parameter (0 when unavailable).
    #[serde(default)]
    pub thickness: f64,
    /// Baseline curve, null when extraction failed.
    #[serde(default)]
    pub baseline: Option<Baseline>,
    /// Triangulated surface, null when extraction failed.
    #[serde(default)]
    pub mesh: Option<Vec<MeshData>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_approx_eq_tolerance() {
        let a = Point3::new(1.0, 2.0, 3.0);
        assert!(a.approx_eq(&Point3::new(1.0005, 2.0, 2.9995), 0.001));
        assert!(!a.approx_eq(&Point3::new(1.002, 2.0, 3.0), 0.001));
    }

    #[test]
    fn test_baseline_wire_names() {
        let baseline = Baseline {
            curve_type: CURVE_LINE_SEGMENT.to_string(),
            start_point: Some(Point3::ORIGIN),
            end_point: Some(Point3::new(5000.0, 0.0, 0.0)),
            segments: vec![],
            center: None,
            radius: None,
        };

        let value = serde_json::to_value(&baseline).unwrap();
        assert_eq!(value["type"], "LineSegment");
        assert_eq!(value["startPoint"], json!({"x": 0.0, "y": 0.0, "z": 0.0}));
        assert_eq!(value["endPoint"]["x"], 5000.0);
        assert!(value.get("radius").is_none());
    }

    #[test]
    fn test_mesh_triangles_as_arrays() {
        let mesh = MeshData {
            grids: vec![MeshGrid {
                vertices: vec![
                    Point3::ORIGIN,
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                ],
                triangles: vec![[0, 1, 2]],
            }],
        };
        let value = serde_json::to_value(&mesh).unwrap();
        assert_eq!(value["grids"][0]["triangles"], json!([[0, 1, 2]]));
    }
}
