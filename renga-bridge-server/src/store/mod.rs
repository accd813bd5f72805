//! Access to the host application's model.
//!
//! The plugin never touches the host API directly; everything goes through
//! [`ModelStore`]. Mutations happen inside a [`Transaction`] which is either
//! applied or rolled back as a unit.

mod memory;

use std::fmt;
use std::str::FromStr;

use renga_bridge_core::protocol::{MeshData, Point3};
use renga_bridge_core::BridgeError;
use thiserror::Error;

pub use memory::{InMemoryModelStore, WallSpec};

/// Identifier of an entity in the model. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(i64);

impl EntityId {
    /// Wraps a raw id, rejecting zero and negative values.
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// Returns the raw id value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .ok()
            .and_then(EntityId::new)
            .ok_or_else(|| StoreError::InvalidId(s.to_string()))
    }
}

/// Category of a model entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A column.
    Column,
    /// A wall.
    Wall,
    /// Anything the bridge does not manage.
    Other,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Column => write!(f, "column"),
            EntityKind::Wall => write!(f, "wall"),
            EntityKind::Other => write!(f, "other"),
        }
    }
}

/// Well-known entity parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    /// Vertical extent.
    Height,
    /// Wall thickness.
    Thickness,
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterId::Height => write!(f, "height"),
            ParameterId::Thickness => write!(f, "thickness"),
        }
    }
}

/// Local coordinate frame of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Origin in model coordinates.
    pub origin: Point3,
    /// Local X axis direction.
    pub x_axis: Point3,
    /// Local Y axis direction.
    pub y_axis: Point3,
}

impl Placement {
    /// An axis-aligned placement at `origin`.
    pub fn at(origin: Point3) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    /// Returns this placement moved by `(dx, dy, dz)`; axes are unchanged.
    pub fn translated(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            origin: Point3::new(self.origin.x + dx, self.origin.y + dy, self.origin.z + dz),
            ..*self
        }
    }

    /// Returns this placement with its origin moved to `target`.
    pub fn moved_to(&self, target: Point3) -> Self {
        self.translated(
            target.x - self.origin.x,
            target.y - self.origin.y,
            target.z - self.origin.z,
        )
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            origin: Point3::ORIGIN,
            x_axis: Point3::new(1.0, 0.0, 0.0),
            y_axis: Point3::new(0.0, 1.0, 0.0),
        }
    }
}

/// A model entity as seen through the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Entity id.
    pub id: EntityId,
    /// Entity category.
    pub kind: EntityKind,
    /// Display name, if the host has one.
    pub name: Option<String>,
}

/// A curve in model coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// Straight segment.
    Line {
        /// Start point.
        start: Point3,
        /// End point.
        end: Point3,
    },
    /// Circular arc.
    Arc {
        /// Start point.
        start: Point3,
        /// End point.
        end: Point3,
        /// Arc center.
        center: Point3,
        /// Arc radius.
        radius: f64,
    },
    /// Chain of simple curves.
    Poly(Vec<Curve>),
}

impl Curve {
    /// First point of the curve, if it has one.
    pub fn start(&self) -> Option<Point3> {
        match self {
            Curve::Line { start, .. } | Curve::Arc { start, .. } => Some(*start),
            Curve::Poly(parts) => parts.first().and_then(Curve::start),
        }
    }

    /// Last point of the curve, if it has one.
    pub fn end(&self) -> Option<Point3> {
        match self {
            Curve::Line { end, .. } | Curve::Arc { end, .. } => Some(*end),
            Curve::Poly(parts) => parts.last().and_then(Curve::end),
        }
    }
}

/// Geometry extracted from an entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityGeometry {
    /// Baseline curve, for entities that have one.
    pub baseline: Option<Curve>,
    /// Triangulated surfaces.
    pub mesh: Vec<MeshData>,
}

/// Handle for a group of staged mutations.
///
/// Not `Clone`: [`ModelStore::apply`] and [`ModelStore::rollback`] consume
/// it, so a transaction ends exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct Transaction {
    id: u64,
}

impl Transaction {
    /// Creates a transaction handle. Called by store implementations.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// Returns the transaction id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Errors reported by a [`ModelStore`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// No model is open in the host.
    #[error("no active model")]
    NoActiveModel,

    /// The entity does not exist.
    #[error("entity {0} not found")]
    NotFound(EntityId),

    /// A string could not be read as an entity id.
    #[error("invalid entity id: {0}")]
    InvalidId(String),

    /// The entity has no such parameter.
    #[error("entity {id} has no {parameter} parameter")]
    UnsupportedParameter {
        /// Entity id.
        id: EntityId,
        /// Requested parameter.
        parameter: ParameterId,
    },

    /// The transaction could not be started, applied or was unknown.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// Geometry could not be extracted.
    #[error("geometry unavailable for entity {id}: {reason}")]
    Geometry {
        /// Entity id.
        id: EntityId,
        /// Failure description.
        reason: String,
    },
}

impl From<StoreError> for BridgeError {
    fn from(err: StoreError) -> Self {
        BridgeError::ModelStore(err.to_string())
    }
}

/// Model access used by the command handlers.
///
/// Reads observe applied state only. Writes take a transaction and become
/// visible when it is applied.
pub trait ModelStore: fmt::Debug + Send + Sync {
    /// Returns true if a model is open.
    fn has_active_model(&self) -> bool;

    /// Starts a transaction.
    fn begin_transaction(&self) -> Result<Transaction, StoreError>;

    /// Makes the transaction's writes visible, all or nothing.
    fn apply(&self, tx: Transaction) -> Result<(), StoreError>;

    /// Discards the transaction's writes.
    fn rollback(&self, tx: Transaction);

    /// Creates a new entity of `kind` inside `tx`.
    fn create_entity(&self, tx: &Transaction, kind: EntityKind) -> Result<EntityId, StoreError>;

    /// Looks up an entity.
    fn entity(&self, id: EntityId) -> Option<Entity>;

    /// Returns true if `id` exists and is of `kind`.
    fn exists(&self, id: EntityId, kind: EntityKind) -> bool {
        self.entity(id).is_some_and(|e| e.kind == kind)
    }

    /// Reads an entity's placement.
    fn placement(&self, id: EntityId) -> Result<Placement, StoreError>;

    /// Sets an entity's placement inside `tx`.
    fn set_placement(
        &self,
        tx: &Transaction,
        id: EntityId,
        placement: Placement,
    ) -> Result<(), StoreError>;

    /// Reads a numeric parameter.
    fn parameter(&self, id: EntityId, parameter: ParameterId) -> Result<f64, StoreError>;

    /// Sets a numeric parameter inside `tx`.
    fn set_parameter(
        &self,
        tx: &Transaction,
        id: EntityId,
        parameter: ParameterId,
        value: f64,
    ) -> Result<(), StoreError>;

    /// Lists entities of `kind` in ascending id order.
    fn entities(&self, kind: EntityKind) -> Result<Vec<EntityId>, StoreError>;

    /// Extracts baseline and mesh geometry.
    fn extract_geometry(&self, id: EntityId) -> Result<EntityGeometry, StoreError>;
}
