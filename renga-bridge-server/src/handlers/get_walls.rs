//! `get_walls`: read wall geometry from the active model.

use std::sync::Arc;

use renga_bridge_core::protocol::geometry::{CURVE_ARC, CURVE_LINE_SEGMENT, CURVE_POLY_CURVE};
use renga_bridge_core::protocol::{Baseline, CurveSegment, GetWallsResponse, Request, WallInfo};
use renga_bridge_core::{BridgeError, Result};
use serde_json::Value;

use crate::router::CommandHandler;
use crate::store::{Curve, EntityId, EntityKind, ModelStore, ParameterId, StoreError};

/// Handler for `get_walls`.
#[derive(Debug, Clone)]
pub struct GetWallsHandler {
    store: Arc<dyn ModelStore>,
}

impl GetWallsHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self { store }
    }

    fn numeric(&self, id: EntityId, parameter: ParameterId) -> f64 {
        match self.store.parameter(id, parameter) {
            Ok(value) if value.is_finite() => value,
            Ok(_) => 0.0,
            Err(e) => {
                tracing::debug!(entity = %id, error = %e, "parameter unavailable");
                0.0
            }
        }
    }

    /// Describes one wall, or `None` if it vanished while being read.
    fn describe(&self, id: EntityId) -> Option<WallInfo> {
        let Some(entity) = self.store.entity(id) else {
            tracing::debug!(entity = %id, "wall disappeared during enumeration");
            return None;
        };

        let name = entity
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Wall {}", id));
        let position = self.store.placement(id).ok().map(|p| p.origin);

        let (baseline, mesh) = match self.store.extract_geometry(id) {
            Ok(geometry) => (
                geometry.baseline.as_ref().map(baseline_from_curve),
                Some(geometry.mesh),
            ),
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(entity = %id, "wall disappeared during enumeration");
                return None;
            }
            Err(e) => {
                tracing::warn!(entity = %id, error = %e, "failed to extract wall geometry");
                (None, None)
            }
        };

        Some(WallInfo {
            id: id.value(),
            name,
            position,
            height: self.numeric(id, ParameterId::Height),
            thickness: self.numeric(id, ParameterId::Thickness),
            baseline,
            mesh,
        })
    }
}

impl CommandHandler for GetWallsHandler {
    fn handle(&self, _request: &Request) -> Result<Value> {
        if !self.store.has_active_model() {
            return Err(BridgeError::ModelStore("no active model".to_string()));
        }

        let walls: Vec<WallInfo> = self
            .store
            .entities(EntityKind::Wall)?
            .into_iter()
            .filter_map(|id| self.describe(id))
            .collect();

        tracing::debug!(count = walls.len(), "collected walls");
        Ok(serde_json::to_value(GetWallsResponse { walls })?)
    }
}

fn segments_of(curve: &Curve, out: &mut Vec<CurveSegment>) {
    match curve {
        Curve::Line { start, end } => out.push(CurveSegment {
            curve_type: CURVE_LINE_SEGMENT.to_string(),
            start_point: *start,
            end_point: *end,
            center: None,
            radius: None,
        }),
        Curve::Arc {
            start,
            end,
            center,
            radius,
        } => out.push(CurveSegment {
            curve_type: CURVE_ARC.to_string(),
            start_point: *start,
            end_point: *end,
            center: Some(*center),
            radius: Some(*radius),
        }),
        Curve::Poly(parts) => parts.iter().for_each(|part| segments_of(part, out)),
    }
}

/// Converts a model curve into its wire description.
///
/// Nested chains are flattened into one segment list.
pub fn baseline_from_curve(curve: &Curve) -> Baseline {
    let mut segments = Vec::new();
    segments_of(curve, &mut segments);

    let (curve_type, center, radius) = match curve {
        Curve::Line { .. } => (CURVE_LINE_SEGMENT, None, None),
        Curve::Arc { center, radius, .. } => (CURVE_ARC, Some(*center), Some(*radius)),
        Curve::Poly(_) => (CURVE_POLY_CURVE, None, None),
    };

    Baseline {
        curve_type: curve_type.to_string(),
        start_point: curve.start(),
        end_point: curve.end(),
        segments,
        center,
        radius,
    }
}
