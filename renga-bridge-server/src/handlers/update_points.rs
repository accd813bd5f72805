//! `update_points`: create or move columns from a batch of points.

use std::sync::Arc;

use renga_bridge_core::protocol::{RawUpdatePoints, Request, UpdatePointsResponse};
use renga_bridge_core::{BridgeError, Result};
use serde_json::Value;

use crate::reconcile::ColumnReconciler;
use crate::router::CommandHandler;
use crate::store::ModelStore;

const NO_POINTS: &str = "no points provided";

/// Handler for `update_points`.
#[derive(Debug, Clone)]
pub struct UpdatePointsHandler {
    store: Arc<dyn ModelStore>,
    reconciler: ColumnReconciler,
}

impl UpdatePointsHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn ModelStore>, reconciler: ColumnReconciler) -> Self {
        Self { store, reconciler }
    }
}

impl CommandHandler for UpdatePointsHandler {
    fn handle(&self, request: &Request) -> Result<Value> {
        let points = request
            .payload::<RawUpdatePoints>()
            .ok()
            .and_then(|body| body.points)
            .filter(|points| !points.is_empty())
            .ok_or_else(|| BridgeError::Validation(NO_POINTS.to_string()))?;

        if !self.store.has_active_model() {
            return Err(BridgeError::ModelStore("no active model".to_string()));
        }

        let results = self.reconciler.reconcile(&points);
        Ok(serde_json::to_value(UpdatePointsResponse { results })?)
    }
}
