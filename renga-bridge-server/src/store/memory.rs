//! In-memory [`ModelStore`] used by the standalone server and by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use renga_bridge_core::protocol::{MeshData, Point3};

use super::{
    Curve, Entity, EntityGeometry, EntityId, EntityKind, ModelStore, ParameterId, Placement,
    StoreError, Transaction,
};

/// Description of a wall to insert with [`InMemoryModelStore::insert_wall`].
#[derive(Debug, Clone, Default)]
pub struct WallSpec {
    /// Display name; `None` leaves the wall unnamed.
    pub name: Option<String>,
    /// Placement of the wall.
    pub placement: Placement,
    /// Height parameter.
    pub height: f64,
    /// Thickness parameter.
    pub thickness: f64,
    /// Baseline curve.
    pub baseline: Option<Curve>,
    /// Triangulated surfaces.
    pub mesh: Vec<MeshData>,
}

impl WallSpec {
    /// A straight wall from `start` to `end`.
    pub fn straight(start: Point3, end: Point3, height: f64, thickness: f64) -> Self {
        Self {
            placement: Placement::at(start),
            height,
            thickness,
            baseline: Some(Curve::Line { start, end }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
struct StoredEntity {
    kind: EntityKind,
    name: Option<String>,
    placement: Placement,
    parameters: HashMap<ParameterId, f64>,
    baseline: Option<Curve>,
    mesh: Vec<MeshData>,
    geometry_error: Option<String>,
}

impl StoredEntity {
    fn new(kind: EntityKind) -> Self {
        let parameters = match kind {
            EntityKind::Column => [(ParameterId::Height, 0.0)].into_iter().collect(),
            EntityKind::Wall => [(ParameterId::Height, 0.0), (ParameterId::Thickness, 0.0)]
                .into_iter()
                .collect(),
            EntityKind::Other => HashMap::new(),
        };
        Self {
            kind,
            name: None,
            placement: Placement::default(),
            parameters,
            baseline: None,
            mesh: Vec::new(),
            geometry_error: None,
        }
    }
}

#[derive(Debug)]
enum StagedWrite {
    Create(EntityId, StoredEntity),
    Placement(EntityId, Placement),
    Parameter(EntityId, ParameterId, f64),
}

#[derive(Debug)]
struct State {
    active_model: bool,
    next_entity_id: i64,
    next_transaction_id: u64,
    entities: BTreeMap<EntityId, StoredEntity>,
    staged: HashMap<u64, Vec<StagedWrite>>,
    fail_next_apply: Option<String>,
}

impl State {
    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    fn writes(&mut self, tx: &Transaction) -> Result<&mut Vec<StagedWrite>, StoreError> {
        self.staged
            .get_mut(&tx.id())
            .ok_or_else(|| StoreError::Transaction(format!("unknown transaction {}", tx.id())))
    }

    /// Finds an entity either applied or created earlier in `tx`.
    fn visible(&self, tx: &Transaction, id: EntityId) -> Option<&StoredEntity> {
        self.entities.get(&id).or_else(|| {
            self.staged.get(&tx.id())?.iter().find_map(|w| match w {
                StagedWrite::Create(created, entity) if *created == id => Some(entity),
                _ => None,
            })
        })
    }
}

/// A [`ModelStore`] backed by an in-process table.
///
/// Entity ids are positive and increase monotonically. Writes are staged per
/// transaction and applied atomically. Extra methods let tests simulate
/// external edits to the model.
#[derive(Debug)]
pub struct InMemoryModelStore {
    state: Mutex<State>,
}

impl InMemoryModelStore {
    /// Creates an empty store with an active model.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                active_model: true,
                next_entity_id: 1,
                next_transaction_id: 1,
                entities: BTreeMap::new(),
                staged: HashMap::new(),
                fail_next_apply: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens or closes the model.
    pub fn set_active_model(&self, active: bool) {
        self.state().active_model = active;
    }

    /// Makes the next [`ModelStore::apply`] fail with `reason`.
    pub fn fail_next_apply(&self, reason: impl Into<String>) {
        self.state().fail_next_apply = Some(reason.into());
    }

    /// Deletes an entity outside any transaction.
    pub fn remove_entity(&self, id: EntityId) -> bool {
        self.state().entities.remove(&id).is_some()
    }

    /// Changes the kind of an existing entity.
    pub fn set_kind(&self, id: EntityId, kind: EntityKind) -> bool {
        match self.state().entities.get_mut(&id) {
            Some(entity) => {
                entity.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Removes support for `parameter` from an entity.
    pub fn drop_parameter(&self, id: EntityId, parameter: ParameterId) -> bool {
        self.state()
            .entities
            .get_mut(&id)
            .is_some_and(|e| e.parameters.remove(&parameter).is_some())
    }

    /// Makes geometry extraction fail for an entity.
    pub fn break_geometry(&self, id: EntityId, reason: impl Into<String>) -> bool {
        match self.state().entities.get_mut(&id) {
            Some(entity) => {
                entity.geometry_error = Some(reason.into());
                true
            }
            None => false,
        }
    }

    /// Inserts a wall outside any transaction.
    pub fn insert_wall(&self, spec: WallSpec) -> EntityId {
        let mut state = self.state();
        let id = state.allocate_id();
        let mut entity = StoredEntity::new(EntityKind::Wall);
        entity.name = spec.name;
        entity.placement = spec.placement;
        entity.parameters.insert(ParameterId::Height, spec.height);
        entity.parameters.insert(ParameterId::Thickness, spec.thickness);
        entity.baseline = spec.baseline;
        entity.mesh = spec.mesh;
        state.entities.insert(id, entity);
        id
    }

    /// Inserts an entity of `kind` at `origin` outside any transaction.
    pub fn insert_entity(&self, kind: EntityKind, origin: Point3) -> EntityId {
        let mut state = self.state();
        let id = state.allocate_id();
        let mut entity = StoredEntity::new(kind);
        entity.placement = Placement::at(origin);
        state.entities.insert(id, entity);
        id
    }

    /// Returns the number of applied entities of `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.state()
            .entities
            .values()
            .filter(|e| e.kind == kind)
            .count()
    }

    /// Returns the number of transactions neither applied nor rolled back.
    pub fn open_transactions(&self) -> usize {
        self.state().staged.len()
    }
}

impl Default for InMemoryModelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelStore for InMemoryModelStore {
    fn has_active_model(&self) -> bool {
        self.state().active_model
    }

    fn begin_transaction(&self) -> Result<Transaction, StoreError> {
        let mut state = self.state();
        if !state.active_model {
            return Err(StoreError::NoActiveModel);
        }
        let id = state.next_transaction_id;
        state.next_transaction_id += 1;
        state.staged.insert(id, Vec::new());
        Ok(Transaction::new(id))
    }

    fn apply(&self, tx: Transaction) -> Result<(), StoreError> {
        let mut state = self.state();
        let writes = state
            .staged
            .remove(&tx.id())
            .ok_or_else(|| StoreError::Transaction(format!("unknown transaction {}", tx.id())))?;

        if let Some(reason) = state.fail_next_apply.take() {
            return Err(StoreError::Transaction(reason));
        }

        let created: Vec<EntityId> = writes
            .iter()
            .filter_map(|w| match w {
                StagedWrite::Create(id, _) => Some(*id),
                _ => None,
            })
            .collect();
        for write in &writes {
            let target = match write {
                StagedWrite::Placement(id, _) | StagedWrite::Parameter(id, _, _) => *id,
                StagedWrite::Create(..) => continue,
            };
            if !state.entities.contains_key(&target) && !created.contains(&target) {
                return Err(StoreError::NotFound(target));
            }
        }

        for write in writes {
            match write {
                StagedWrite::Create(id, entity) => {
                    state.entities.insert(id, entity);
                }
                StagedWrite::Placement(id, placement) => {
                    if let Some(entity) = state.entities.get_mut(&id) {
                        entity.placement = placement;
                    }
                }
                StagedWrite::Parameter(id, parameter, value) => {
                    if let Some(entity) = state.entities.get_mut(&id) {
                        entity.parameters.insert(parameter, value);
                    }
                }
            }
        }
        Ok(())
    }

    fn rollback(&self, tx: Transaction) {
        self.state().staged.remove(&tx.id());
    }

    fn create_entity(&self, tx: &Transaction, kind: EntityKind) -> Result<EntityId, StoreError> {
        let mut state = self.state();
        state.writes(tx)?;
        let id = state.allocate_id();
        state
            .writes(tx)?
            .push(StagedWrite::Create(id, StoredEntity::new(kind)));
        Ok(id)
    }

    fn entity(&self, id: EntityId) -> Option<Entity> {
        self.state().entities.get(&id).map(|e| Entity {
            id,
            kind: e.kind,
            name: e.name.clone(),
        })
    }

    fn placement(&self, id: EntityId) -> Result<Placement, StoreError> {
        self.state()
            .entities
            .get(&id)
            .map(|e| e.placement)
            .ok_or(StoreError::NotFound(id))
    }

    fn set_placement(
        &self,
        tx: &Transaction,
        id: EntityId,
        placement: Placement,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.visible(tx, id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        state.writes(tx)?.push(StagedWrite::Placement(id, placement));
        Ok(())
    }

    fn parameter(&self, id: EntityId, parameter: ParameterId) -> Result<f64, StoreError> {
        let state = self.state();
        let entity = state.entities.get(&id).ok_or(StoreError::NotFound(id))?;
        entity
            .parameters
            .get(&parameter)
            .copied()
            .ok_or(StoreError::UnsupportedParameter { id, parameter })
    }

    fn set_parameter(
        &self,
        tx: &Transaction,
        id: EntityId,
        parameter: ParameterId,
        value: f64,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let entity = state.visible(tx, id).ok_or(StoreError::NotFound(id))?;
        if !entity.parameters.contains_key(&parameter) {
            return Err(StoreError::UnsupportedParameter { id, parameter });
        }
        state
            .writes(tx)?
            .push(StagedWrite::Parameter(id, parameter, value));
        Ok(())
    }

    fn entities(&self, kind: EntityKind) -> Result<Vec<EntityId>, StoreError> {
        let state = self.state();
        if !state.active_model {
            return Err(StoreError::NoActiveModel);
        }
        Ok(state
            .entities
            .iter()
            .filter(|(_, e)| e.kind == kind)
            .map(|(id, _)| *id)
            .collect())
    }

    fn extract_geometry(&self, id: EntityId) -> Result<EntityGeometry, StoreError> {
        let state = self.state();
        let entity = state.entities.get(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(reason) = &entity.geometry_error {
            return Err(StoreError::Geometry {
                id,
                reason: reason.clone(),
            });
        }
        Ok(EntityGeometry {
            baseline: entity.baseline.clone(),
            mesh: entity.mesh.clone(),
        })
    }
}
