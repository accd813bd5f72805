//! Create-or-update of columns from client points.
//!
//! Every point is reconciled on its own: the outcome of one point never
//! aborts the batch, and results come back in input order.

use std::sync::Arc;

use renga_bridge_core::protocol::{Point3, PointOutcome, PointUpsert};
use serde_json::Value;
use tracing::instrument;

use crate::identity::{IdentityGuard, IdentityMap};
use crate::store::{
    EntityId, EntityKind, ModelStore, ParameterId, Placement, StoreError, Transaction,
};

const COLUMN_CREATED: &str = "Column created";
const COLUMN_UPDATED: &str = "Column updated";
const COLUMN_NOT_FOUND: &str = "Column not found";
const MISSING_CLIENT_IDENTITY: &str = "missing client identity";
const INVALID_COORDINATES: &str = "invalid coordinates";

/// Decides, per point, whether to create a new column or move an existing one.
#[derive(Debug, Clone)]
pub struct ColumnReconciler {
    store: Arc<dyn ModelStore>,
    identities: Arc<IdentityMap>,
    default_height: f64,
}

impl ColumnReconciler {
    /// Creates a reconciler over `store` and `identities`.
    pub fn new(
        store: Arc<dyn ModelStore>,
        identities: Arc<IdentityMap>,
        default_height: f64,
    ) -> Self {
        Self {
            store,
            identities,
            default_height,
        }
    }

    /// Returns the identity map.
    pub fn identities(&self) -> &Arc<IdentityMap> {
        &self.identities
    }

    /// Reconciles a batch of raw point objects.
    #[instrument(name = "reconciler.batch", skip_all, fields(count = points.len()))]
    pub fn reconcile(&self, points: &[Value]) -> Vec<PointOutcome> {
        let outcomes: Vec<PointOutcome> =
            points.iter().map(|raw| self.reconcile_raw(raw)).collect();

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        tracing::info!(
            succeeded,
            failed = outcomes.len() - succeeded,
            "reconciled points"
        );
        outcomes
    }

    fn reconcile_raw(&self, raw: &Value) -> PointOutcome {
        if !raw.is_object() {
            return PointOutcome::failed("invalid point data: expected an object", None);
        }

        match serde_json::from_value::<PointUpsert>(raw.clone()) {
            Ok(point) => self.reconcile_point(&point),
            Err(e) => {
                PointOutcome::failed(format!("invalid point data: {}", e), echo_identity(raw))
            }
        }
    }

    /// Reconciles one parsed point.
    pub fn reconcile_point(&self, point: &PointUpsert) -> PointOutcome {
        let Some(client_id) = point.client_id() else {
            tracing::debug!("point without client identity");
            return PointOutcome::failed(MISSING_CLIENT_IDENTITY, None);
        };
        let echo = Some(client_id.to_string());

        let position = point.position();
        if !position.is_finite() {
            return PointOutcome::failed(INVALID_COORDINATES, echo);
        }
        let height = self.resolve_height(point.height, client_id);

        let mut identities = self.identities.lock();
        match self.resolve_target(&mut identities, client_id, point.entity_hint()) {
            Some(id) => self.update(&mut identities, client_id, id, position, height),
            None => self.create(&mut identities, client_id, position, height),
        }
    }

    fn resolve_height(&self, requested: Option<f64>, client_id: &str) -> f64 {
        match requested {
            None => self.default_height,
            Some(h) if h.is_finite() && h > 0.0 => h,
            Some(h) => {
                tracing::warn!(
                    client_id,
                    height = h,
                    default = self.default_height,
                    "unusable column height, using default"
                );
                self.default_height
            }
        }
    }

    fn resolve_target(
        &self,
        identities: &mut IdentityGuard<'_>,
        client_id: &str,
        hint: Option<&str>,
    ) -> Option<EntityId> {
        if let Some(id) = identities.get(client_id) {
            if self.store.exists(id, EntityKind::Column) {
                return Some(id);
            }
            tracing::debug!(client_id, entity = %id, "dropping stale link");
            identities.unlink(client_id);
        }

        let hint = hint?;
        match hint.parse::<EntityId>() {
            Ok(id) if self.store.exists(id, EntityKind::Column) => {
                identities.link(client_id, id);
                Some(id)
            }
            Ok(id) => {
                tracing::debug!(client_id, entity = %id, "hinted entity is not a column");
                None
            }
            Err(_) => {
                tracing::debug!(client_id, hint, "ignoring unparseable entity hint");
                None
            }
        }
    }

    fn update(
        &self,
        identities: &mut IdentityGuard<'_>,
        client_id: &str,
        id: EntityId,
        position: Point3,
        height: f64,
    ) -> PointOutcome {
        let echo = Some(client_id.to_string());

        let result = self.store.placement(id).and_then(|current| {
            self.transact(|tx| {
                self.store.set_placement(tx, id, current.moved_to(position))?;
                self.set_height(tx, id, height)
            })
        });

        match result {
            Ok(()) => {
                tracing::debug!(client_id, entity = %id, "column updated");
                PointOutcome::ok(COLUMN_UPDATED, id.to_string(), echo)
            }
            Err(StoreError::NotFound(_)) => {
                identities.unlink(client_id);
                PointOutcome::failed(COLUMN_NOT_FOUND, echo)
            }
            Err(e) => {
                tracing::warn!(client_id, entity = %id, error = %e, "column update failed");
                PointOutcome::failed(format!("Error updating column: {}", e), echo)
            }
        }
    }

    fn create(
        &self,
        identities: &mut IdentityGuard<'_>,
        client_id: &str,
        position: Point3,
        height: f64,
    ) -> PointOutcome {
        let echo = Some(client_id.to_string());

        let result = self.transact(|tx| {
            let id = self.store.create_entity(tx, EntityKind::Column)?;
            self.store.set_placement(tx, id, Placement::default().moved_to(position))?;
            self.set_height(tx, id, height)?;
            Ok(id)
        });

        match result {
            Ok(id) => {
                identities.link(client_id, id);
                tracing::debug!(client_id, entity = %id, "column created");
                PointOutcome::ok(COLUMN_CREATED, id.to_string(), echo)
            }
            Err(e) => {
                tracing::warn!(client_id, error = %e, "column creation failed");
                PointOutcome::failed(format!("Error creating column: {}", e), echo)
            }
        }
    }

    /// Runs `stage` in a fresh transaction, applying on success and rolling
    /// back on failure.
    fn transact<T>(
        &self,
        stage: impl FnOnce(&Transaction) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tx = self.store.begin_transaction()?;
        match stage(&tx) {
            Ok(value) => {
                self.store.apply(tx)?;
                Ok(value)
            }
            Err(e) => {
                self.store.rollback(tx);
                Err(e)
            }
        }
    }

    fn set_height(&self, tx: &Transaction, id: EntityId, height: f64) -> Result<(), StoreError> {
        match self.store.set_parameter(tx, id, ParameterId::Height, height) {
            Err(StoreError::UnsupportedParameter { .. }) => {
                tracing::debug!(entity = %id, "column has no height parameter");
                Ok(())
            }
            other => other,
        }
    }
}

fn echo_identity(raw: &Value) -> Option<String> {
    match raw.get("grasshopperGuid")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryModelStore;
    use serde_json::json;

    fn setup() -> (Arc<InMemoryModelStore>, ColumnReconciler) {
        let store = Arc::new(InMemoryModelStore::new());
        let reconciler = ColumnReconciler::new(store.clone(), Arc::new(IdentityMap::new()), 3000.0);
        (store, reconciler)
    }

    fn column_id(outcome: &PointOutcome) -> EntityId {
        outcome.column_id.as_deref().unwrap().parse().unwrap()
    }

    #[test]
    fn test_create_then_update_same_identity() {
        let (store, reconciler) = setup();

        let first =
            reconciler.reconcile(&[json!({"x": 0, "y": 0, "z": 0, "grasshopperGuid": "a"})]);
        assert_eq!(first[0].message, "Column created");
        let id = column_id(&first[0]);

        let second =
            reconciler.reconcile(&[json!({"x": 500, "y": 250, "z": 0, "grasshopperGuid": "a"})]);
        assert_eq!(second[0].message, "Column updated");
        assert_eq!(column_id(&second[0]), id);
        assert_eq!(store.count(EntityKind::Column), 1);
        assert_eq!(store.placement(id).unwrap().origin, Point3::new(500.0, 250.0, 0.0));
    }

    #[test]
    fn test_update_preserves_rotation() {
        let (store, reconciler) = setup();
        let id = store.insert_entity(EntityKind::Column, Point3::new(10.0, 0.0, 0.0));
        let tx = store.begin_transaction().unwrap();
        let rotated = Placement {
            origin: Point3::new(10.0, 0.0, 0.0),
            x_axis: Point3::new(0.0, 1.0, 0.0),
            y_axis: Point3::new(-1.0, 0.0, 0.0),
        };
        store.set_placement(&tx, id, rotated).unwrap();
        store.apply(tx).unwrap();

        let outcome = reconciler.reconcile_point(&PointUpsert {
            grasshopper_guid: Some("r".into()),
            renga_column_guid: Some(id.to_string()),
            ..PointUpsert::at(Point3::new(20.0, 5.0, 0.0))
        });

        assert!(outcome.success);
        let placement = store.placement(id).unwrap();
        assert_eq!(placement.origin, Point3::new(20.0, 5.0, 0.0));
        assert_eq!(placement.x_axis, rotated.x_axis);
    }

    #[test]
    fn test_missing_identity_touches_nothing() {
        let (store, reconciler) = setup();
        let outcomes =
            reconciler.reconcile(&[json!({"x": 1}), json!({"x": 1, "grasshopperGuid": ""})]);

        for outcome in &outcomes {
            assert!(!outcome.success);
            assert_eq!(outcome.message, "missing client identity");
            assert!(outcome.column_id.is_none());
        }
        assert_eq!(store.count(EntityKind::Column), 0);
    }

    #[test]
    fn test_invalid_point_data() {
        let (_, reconciler) = setup();
        let outcomes = reconciler.reconcile(&[
            json!("not an object"),
            json!({"x": "east", "grasshopperGuid": "g"}),
            json!({"x": "NaN", "grasshopperGuid": "h"}),
        ]);

        assert!(outcomes[0].message.starts_with("invalid point data"));
        assert!(outcomes[1].message.starts_with("invalid point data"));
        assert_eq!(outcomes[1].grasshopper_guid.as_deref(), Some("g"));
        assert_eq!(outcomes[2].message, "invalid coordinates");
    }

    #[test]
    fn test_invalid_point_echoes_boolean_identity() {
        let (_, reconciler) = setup();
        let outcomes = reconciler.reconcile(&[
            json!({"x": "east", "grasshopperGuid": true}),
            json!({"x": "east", "grasshopperGuid": 12}),
            json!({"x": "east", "grasshopperGuid": ["g"]}),
        ]);

        assert_eq!(outcomes[0].grasshopper_guid.as_deref(), Some("true"));
        assert_eq!(outcomes[1].grasshopper_guid.as_deref(), Some("12"));
        assert!(outcomes[2].grasshopper_guid.is_none());
    }

    #[test]
    fn test_stale_link_self_heals() {
        let (store, reconciler) = setup();
        let first = reconciler.reconcile(&[json!({"x": 0, "grasshopperGuid": "a"})]);
        let old = column_id(&first[0]);
        store.remove_entity(old);

        let second = reconciler.reconcile(&[json!({"x": 0, "grasshopperGuid": "a"})]);
        assert_eq!(second[0].message, "Column created");
        let new = column_id(&second[0]);
        assert_ne!(new, old);
        assert_eq!(reconciler.identities().get("a"), Some(new));
    }

    #[test]
    fn test_repurposed_entity_not_reused() {
        let (store, reconciler) = setup();
        let first = reconciler.reconcile(&[json!({"x": 0, "grasshopperGuid": "a"})]);
        let old = column_id(&first[0]);
        store.set_kind(old, EntityKind::Other);

        let second = reconciler.reconcile(&[json!({
            "x": 0, "grasshopperGuid": "a", "rengaColumnGuid": old.to_string()
        })]);
        assert_eq!(second[0].message, "Column created");
        assert_ne!(column_id(&second[0]), old);
    }

    #[test]
    fn test_hint_reassociation_evicts_previous_owner() {
        let (store, reconciler) = setup();
        let existing = store.insert_entity(EntityKind::Column, Point3::ORIGIN);
        reconciler.identities().lock().link("old-owner", existing);

        let outcome = reconciler.reconcile_point(&PointUpsert {
            grasshopper_guid: Some("new-owner".into()),
            renga_column_guid: Some(existing.to_string()),
            ..PointUpsert::at(Point3::new(1.0, 1.0, 0.0))
        });

        assert_eq!(outcome.message, "Column updated");
        assert_eq!(reconciler.identities().get("new-owner"), Some(existing));
        assert_eq!(reconciler.identities().get("old-owner"), None);
    }

    #[test]
    fn test_unparseable_hint_creates() {
        let (store, reconciler) = setup();
        let outcome = reconciler.reconcile_point(&PointUpsert {
            grasshopper_guid: Some("a".into()),
            renga_column_guid: Some("not-an-id".into()),
            ..PointUpsert::default()
        });
        assert_eq!(outcome.message, "Column created");
        assert_eq!(store.count(EntityKind::Column), 1);
    }

    #[test]
    fn test_height_defaulting() {
        let (store, reconciler) = setup();
        let outcomes = reconciler.reconcile(&[
            json!({"grasshopperGuid": "none"}),
            json!({"x": 1, "grasshopperGuid": "zero", "height": 0}),
            json!({"x": 2, "grasshopperGuid": "neg", "height": -5}),
            json!({"x": 3, "grasshopperGuid": "given", "height": 4200}),
        ]);

        let heights: Vec<f64> = outcomes
            .iter()
            .map(|o| store.parameter(column_id(o), ParameterId::Height).unwrap())
            .collect();
        assert_eq!(heights, vec![3000.0, 3000.0, 3000.0, 4200.0]);
    }

    #[test]
    fn test_unreadable_height_uses_default() {
        let (store, reconciler) = setup();
        let outcomes = reconciler.reconcile(&[
            json!({"grasshopperGuid": "a", "height": "tall"}),
            json!({"x": 1, "grasshopperGuid": "b", "height": true}),
            json!({"x": 2, "grasshopperGuid": "c", "height": "2750"}),
        ]);

        for outcome in &outcomes {
            assert!(outcome.success, "{}", outcome.message);
            assert_eq!(outcome.message, "Column created");
        }
        let heights: Vec<f64> = outcomes
            .iter()
            .map(|o| store.parameter(column_id(o), ParameterId::Height).unwrap())
            .collect();
        assert_eq!(heights, vec![3000.0, 3000.0, 2750.0]);
    }

    #[test]
    fn test_unsupported_height_is_not_a_failure() {
        let (store, reconciler) = setup();
        let id = store.insert_entity(EntityKind::Column, Point3::ORIGIN);
        store.drop_parameter(id, ParameterId::Height);

        let outcome = reconciler.reconcile_point(&PointUpsert {
            grasshopper_guid: Some("a".into()),
            renga_column_guid: Some(id.to_string()),
            height: Some(2000.0),
            ..PointUpsert::at(Point3::new(3.0, 0.0, 0.0))
        });
        assert!(outcome.success);
        assert_eq!(store.placement(id).unwrap().origin, Point3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_transaction_failure_isolated_to_item() {
        let (store, reconciler) = setup();
        let first = reconciler.reconcile(&[json!({"x": 0, "grasshopperGuid": "a"})]);
        let id = column_id(&first[0]);

        store.fail_next_apply("locked by another user");
        let outcomes = reconciler.reconcile(&[
            json!({"x": 100, "grasshopperGuid": "a"}),
            json!({"x": 200, "grasshopperGuid": "b"}),
        ]);

        assert!(!outcomes[0].success);
        assert!(outcomes[0]
            .message
            .starts_with("Error updating column: transaction failed: locked by another user"));
        assert_eq!(store.placement(id).unwrap().origin, Point3::ORIGIN);
        assert_eq!(outcomes[1].message, "Column created");
        assert_eq!(store.open_transactions(), 0);
    }

    #[test]
    fn test_create_failure_leaves_no_link() {
        let (store, reconciler) = setup();
        store.fail_next_apply("out of licenses");

        let outcome = reconciler.reconcile_point(&PointUpsert {
            grasshopper_guid: Some("a".into()),
            ..PointUpsert::default()
        });
        assert_eq!(
            outcome.message,
            "Error creating column: transaction failed: out of licenses"
        );
        assert!(reconciler.identities().get("a").is_none());
        assert_eq!(store.count(EntityKind::Column), 0);
    }

    #[test]
    fn test_concurrent_batches_create_once() {
        let (store, reconciler) = setup();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let reconciler = reconciler.clone();
                scope.spawn(move || {
                    reconciler.reconcile(&[json!({"x": 1, "grasshopperGuid": "shared"})]);
                });
            }
        });

        assert_eq!(store.count(EntityKind::Column), 1);
        assert_eq!(reconciler.identities().len(), 1);
    }
}
