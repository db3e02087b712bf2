use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub origin: Vec3,
    /// `[pitch, yaw, roll]` in degrees.
    pub angles: Vec3,
}

impl Transform {
    pub fn at(origin: Vec3) -> Self {
        Self {
            origin,
            angles: Vec3::ZERO,
        }
    }

    pub fn with_angles(mut self, angles: Vec3) -> Self {
        self.angles = angles;
        self
    }
}

/// Axis-aligned extents relative to the entity origin. Extents do not rotate
/// with the entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Bounds {
    pub fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    pub fn cube(half_extent: f32) -> Self {
        Self {
            mins: Vec3::new(-half_extent, -half_extent, -half_extent),
            maxs: Vec3::new(half_extent, half_extent, half_extent),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.mins.is_finite() && self.maxs.is_finite() && self.mins.all_le(self.maxs)
    }

    pub fn absolute_at(&self, origin: Vec3) -> (Vec3, Vec3) {
        (origin + self.mins, origin + self.maxs)
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform,
    pub bounds: Bounds,
    pub solid: bool,
    /// Takes crush damage instead of holding a mover back indefinitely.
    pub crushable: bool,
    /// Entity this one is resting on, maintained by the physics stepper.
    pub ground_entity: Option<EntityId>,
    /// Scripted attachment that carries this entity regardless of contact.
    pub attached_to: Option<EntityId>,
}

impl Entity {
    pub fn supports(&self) -> impl Iterator<Item = EntityId> {
        self.ground_entity.into_iter().chain(self.attached_to)
    }
}

/// Read access to live entities. Discovery and overlap testing only need this.
pub trait EntityStore {
    /// Live entity ids in ascending order.
    fn entity_ids(&self) -> Vec<EntityId>;
    fn entity(&self, id: EntityId) -> Option<&Entity>;

    fn contains(&self, id: EntityId) -> bool {
        self.entity(id).is_some()
    }

    fn transform(&self, id: EntityId) -> Option<Transform> {
        self.entity(id).map(|entity| entity.transform)
    }
}

/// Write access used while a chain is being propagated.
pub trait EntityStoreMut: EntityStore {
    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity>;

    fn set_transform(&mut self, id: EntityId, transform: Transform) -> bool {
        match self.entity_mut(id) {
            Some(entity) => {
                entity.transform = transform;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct EntityWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    index_by_id: HashMap<EntityId, usize>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
}

impl EntityWorld {
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        bounds: Bounds,
    ) -> EntityId {
        self.spawn_internal(name.into(), transform, bounds, false)
    }

    pub fn spawn_crushable(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        bounds: Bounds,
    ) -> EntityId {
        self.spawn_internal(name.into(), transform, bounds, true)
    }

    fn spawn_internal(
        &mut self,
        name: String,
        transform: Transform,
        bounds: Bounds,
        crushable: bool,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            name,
            transform,
            bounds,
            solid: true,
            crushable,
            ground_entity: None,
            attached_to: None,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.index_by_id.contains_key(&id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    /// Applies queued despawns, then queued spawns. References held by other
    /// entities to a despawned id are left dangling on purpose; discovery
    /// treats them as stale.
    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_spawns
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_despawns.clear();
        }

        self.entities.append(&mut self.pending_spawns);
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index_by_id.clear();
        for (idx, entity) in self.entities.iter().enumerate() {
            self.index_by_id.insert(entity.id, idx);
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.index_by_id.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.index_by_id.get(&id).map(|&idx| &self.entities[idx])
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let idx = *self.index_by_id.get(&id)?;
        self.entities.get_mut(idx)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn set_ground_entity(&mut self, id: EntityId, ground: Option<EntityId>) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.ground_entity = ground;
                true
            }
            None => false,
        }
    }

    pub fn set_attached_to(&mut self, id: EntityId, parent: Option<EntityId>) -> bool {
        match self.find_entity_mut(id) {
            Some(entity) => {
                entity.attached_to = parent;
                true
            }
            None => false,
        }
    }
}

impl EntityStore for EntityWorld {
    fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids = self
            .entities
            .iter()
            .map(|entity| entity.id)
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.find_entity(id)
    }
}

impl EntityStoreMut for EntityWorld {
    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.find_entity_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_box(world: &mut EntityWorld, name: &str, z: f32) -> EntityId {
        world.spawn(
            name,
            Transform::at(Vec3::new(0.0, 0.0, z)),
            Bounds::cube(8.0),
        )
    }

    #[test]
    fn spawn_is_deferred_until_apply_pending() {
        let mut world = EntityWorld::default();
        let id = spawn_box(&mut world, "crate", 0.0);
        assert!(world.find_entity(id).is_none());

        world.apply_pending();
        let entity = world.find_entity(id).expect("crate");
        assert_eq!(entity.name, "crate");
        assert!(entity.solid);
        assert!(!entity.crushable);
    }

    #[test]
    fn allocator_ids_are_monotonic() {
        let mut world = EntityWorld::default();
        let a = spawn_box(&mut world, "a", 0.0);
        let b = spawn_box(&mut world, "b", 0.0);
        assert!(a < b);
    }

    #[test]
    fn despawn_leaves_dangling_support_reference() {
        let mut world = EntityWorld::default();
        let plat = spawn_box(&mut world, "plat", 0.0);
        let rider = spawn_box(&mut world, "rider", 16.0);
        world.apply_pending();
        world.set_ground_entity(rider, Some(plat));

        assert!(world.despawn(plat));
        world.apply_pending();

        assert!(!world.contains(plat));
        let rider = world.find_entity(rider).expect("rider");
        assert_eq!(rider.ground_entity, Some(plat));
    }

    #[test]
    fn despawn_of_pending_spawn_drops_it() {
        let mut world = EntityWorld::default();
        let id = spawn_box(&mut world, "ghost", 0.0);
        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn despawn_unknown_id_is_rejected() {
        let mut world = EntityWorld::default();
        assert!(!world.despawn(EntityId(99)));
    }

    #[test]
    fn index_survives_despawn_in_the_middle() {
        let mut world = EntityWorld::default();
        let a = spawn_box(&mut world, "a", 0.0);
        let b = spawn_box(&mut world, "b", 1.0);
        let c = spawn_box(&mut world, "c", 2.0);
        world.apply_pending();
        world.despawn(b);
        world.apply_pending();

        assert_eq!(world.entity_ids(), vec![a, c]);
        assert_eq!(world.find_entity(c).expect("c").name, "c");
    }

    #[test]
    fn supports_yields_ground_then_attachment() {
        let mut world = EntityWorld::default();
        let id = spawn_box(&mut world, "rider", 0.0);
        world.apply_pending();
        world.set_ground_entity(id, Some(EntityId(4)));
        world.set_attached_to(id, Some(EntityId(7)));

        let supports = world
            .find_entity(id)
            .expect("rider")
            .supports()
            .collect::<Vec<_>>();
        assert_eq!(supports, vec![EntityId(4), EntityId(7)]);
    }
}
