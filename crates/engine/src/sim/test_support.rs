use std::collections::BTreeMap;

use super::entity::{Bounds, Entity, EntityId, EntityStore, EntityStoreMut, Transform};

/// Minimal in-memory store for exercising chain code without an `EntityWorld`.
#[derive(Debug, Default)]
pub(crate) struct FakeStore {
    entities: BTreeMap<EntityId, Entity>,
}

impl FakeStore {
    pub(crate) fn blank_entity(raw: u64) -> Entity {
        Entity {
            id: EntityId(raw),
            name: format!("e{raw}"),
            transform: Transform::default(),
            bounds: Bounds::default(),
            solid: true,
            crushable: false,
            ground_entity: None,
            attached_to: None,
        }
    }

    pub(crate) fn with_entities(count: u64) -> Self {
        let mut store = Self::default();
        for raw in 0..count {
            store.insert(Self::blank_entity(raw));
        }
        store
    }

    pub(crate) fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub(crate) fn remove(&mut self, raw: u64) {
        self.entities.remove(&EntityId(raw));
    }

    pub(crate) fn stand(&mut self, rider: u64, support: u64) {
        if let Some(entity) = self.entities.get_mut(&EntityId(rider)) {
            entity.ground_entity = Some(EntityId(support));
        }
    }

    pub(crate) fn attach(&mut self, rider: u64, parent: u64) {
        if let Some(entity) = self.entities.get_mut(&EntityId(rider)) {
            entity.attached_to = Some(EntityId(parent));
        }
    }

    pub(crate) fn place(&mut self, raw: u64, transform: Transform) {
        if let Some(entity) = self.entities.get_mut(&EntityId(raw)) {
            entity.transform = transform;
        }
    }
}

impl EntityStore for FakeStore {
    fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }
}

impl EntityStoreMut for FakeStore {
    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }
}
