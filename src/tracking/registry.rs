//! Last-known authoritative attributes per vehicle

use crate::core::{Entity, EntityId, EntityUpdate, GeoPoint};
use std::collections::HashMap;

/// Ordered registry of every vehicle seen this session.
///
/// Entries are never removed individually; only [`EntityRegistry::replace_all`]
/// drops records.
#[derive(Debug, Default, Clone)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an unknown vehicle or merge over the existing record.
    ///
    /// Returns true when the vehicle was not known before.
    pub fn upsert(&mut self, update: EntityUpdate) -> bool {
        match self.index.get(&update.id) {
            Some(&idx) => {
                self.entities[idx].merge(&update);
                false
            }
            None => {
                self.index.insert(update.id.clone(), self.entities.len());
                self.entities.push(update.into());
                true
            }
        }
    }

    /// Insert a placeholder at `position` only if the vehicle is unknown
    pub fn ensure(&mut self, id: &EntityId, position: GeoPoint) -> bool {
        if self.index.contains_key(id) {
            return false;
        }
        self.upsert(EntityUpdate::new(id.clone(), position).with_label(id.as_str()))
    }

    /// Replace the contents wholesale with a snapshot, keeping its order.
    ///
    /// Duplicate identifiers inside one snapshot collapse into a single record,
    /// later items merging over earlier ones.
    pub fn replace_all(&mut self, snapshot: impl IntoIterator<Item = EntityUpdate>) {
        self.entities.clear();
        self.index.clear();
        for update in snapshot {
            self.upsert(update);
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.index.get(id).map(|&idx| &self.entities[idx])
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    /// Records in insertion (or snapshot) order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
