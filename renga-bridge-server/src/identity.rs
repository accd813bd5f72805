//! Mapping from client point identities to model entities.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::store::EntityId;

#[derive(Debug, Default)]
struct Table {
    forward: HashMap<String, EntityId>,
    reverse: HashMap<EntityId, String>,
}

/// Client identity to entity id table, shared by all connections.
///
/// Each entity is linked to at most one client identity. The table lives
/// as long as the server; it is not persisted.
#[derive(Debug, Default)]
pub struct IdentityMap {
    table: Mutex<Table>,
}

impl IdentityMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the table for a sequence of lookups and updates.
    ///
    /// Hold the guard for the whole decide-and-write sequence of one item
    /// so that concurrent batches cannot both create an entity for the same
    /// identity.
    pub fn lock(&self) -> IdentityGuard<'_> {
        IdentityGuard {
            table: self.table.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Returns the entity linked to `client_id`.
    pub fn get(&self, client_id: &str) -> Option<EntityId> {
        self.lock().get(client_id)
    }

    /// Returns the number of links.
    pub fn len(&self) -> usize {
        self.lock().table.forward.len()
    }

    /// Returns true if there are no links.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to an [`IdentityMap`].
#[derive(Debug)]
pub struct IdentityGuard<'a> {
    table: MutexGuard<'a, Table>,
}

impl IdentityGuard<'_> {
    /// Returns the entity linked to `client_id`.
    pub fn get(&self, client_id: &str) -> Option<EntityId> {
        self.table.forward.get(client_id).copied()
    }

    /// Links `client_id` to `entity`.
    ///
    /// Drops any previous link of `client_id` and any other identity that
    /// pointed at `entity`.
    pub fn link(&mut self, client_id: &str, entity: EntityId) {
        if let Some(previous_owner) = self.table.reverse.remove(&entity) {
            if previous_owner != client_id {
                tracing::debug!(
                    entity = %entity,
                    previous = %previous_owner,
                    current = %client_id,
                    "entity re-associated"
                );
            }
            self.table.forward.remove(&previous_owner);
        }
        if let Some(previous_entity) = self.table.forward.insert(client_id.to_string(), entity) {
            self.table.reverse.remove(&previous_entity);
        }
        self.table.reverse.insert(entity, client_id.to_string());
    }

    /// Removes the link of `client_id`, returning the entity it pointed at.
    pub fn unlink(&mut self, client_id: &str) -> Option<EntityId> {
        let entity = self.table.forward.remove(client_id)?;
        self.table.reverse.remove(&entity);
        Some(entity)
    }

    /// Returns the identity linked to `entity`.
    pub fn owner(&self, entity: EntityId) -> Option<&str> {
        self.table.reverse.get(&entity).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    #[test]
    fn test_link_and_get() {
        let map = IdentityMap::new();
        map.lock().link("a", id(1));
        assert_eq!(map.get("a"), Some(id(1)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.lock().owner(id(1)), Some("a"));
    }

    #[test]
    fn test_relink_evicts_previous_owner() {
        let map = IdentityMap::new();
        {
            let mut guard = map.lock();
            guard.link("a", id(1));
            guard.link("b", id(1));
        }
        assert_eq!(map.get("a"), None);
        assert_eq!(map.get("b"), Some(id(1)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_relink_identity_to_new_entity() {
        let map = IdentityMap::new();
        {
            let mut guard = map.lock();
            guard.link("a", id(1));
            guard.link("a", id(2));
            assert_eq!(guard.owner(id(1)), None);
            assert_eq!(guard.owner(id(2)), Some("a"));
        }
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_unlink() {
        let map = IdentityMap::new();
        map.lock().link("a", id(3));
        assert_eq!(map.lock().unlink("a"), Some(id(3)));
        assert_eq!(map.lock().unlink("a"), None);
        assert!(map.is_empty());
    }
}
