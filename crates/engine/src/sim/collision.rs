use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityStore, Transform};
use super::math::Vec3;
use super::push::{Overlap, OverlapQuery};

/// Immovable world geometry as an absolute axis-aligned box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticSolid {
    pub name: String,
    pub mins: Vec3,
    pub maxs: Vec3,
}

/// Axis-aligned box overlap test against static solids and solid entities.
/// Touching faces do not count as overlap, so a rider resting exactly on a
/// platform top is clear.
#[derive(Debug, Default, Clone)]
pub struct BoxCollision {
    solids: Vec<StaticSolid>,
}

impl BoxCollision {
    pub fn new(solids: Vec<StaticSolid>) -> Self {
        Self { solids }
    }

    pub fn add_solid(&mut self, solid: StaticSolid) {
        self.solids.push(solid);
    }

    pub fn solids(&self) -> &[StaticSolid] {
        &self.solids
    }
}

fn boxes_overlap(a: (Vec3, Vec3), b: (Vec3, Vec3)) -> bool {
    a.0.x < b.1.x
        && a.1.x > b.0.x
        && a.0.y < b.1.y
        && a.1.y > b.0.y
        && a.0.z < b.1.z
        && a.1.z > b.0.z
}

impl OverlapQuery for BoxCollision {
    fn overlaps(&self, store: &dyn EntityStore, id: EntityId, at: Transform) -> Vec<Overlap> {
        let Some(entity) = store.entity(id) else {
            return Vec::new();
        };
        if !entity.solid {
            return Vec::new();
        }
        let candidate = entity.bounds.absolute_at(at.origin);

        let mut overlaps = Vec::new();
        if self
            .solids
            .iter()
            .any(|solid| boxes_overlap(candidate, (solid.mins, solid.maxs)))
        {
            overlaps.push(Overlap::World);
        }

        for other_id in store.entity_ids() {
            if other_id == id {
                continue;
            }
            let Some(other) = store.entity(other_id) else {
                continue;
            };
            if !other.solid {
                continue;
            }
            let other_box = other.bounds.absolute_at(other.transform.origin);
            if boxes_overlap(candidate, other_box) {
                overlaps.push(Overlap::Entity(other_id));
            }
        }
        overlaps
    }
}
