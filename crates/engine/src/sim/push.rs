use serde::{Deserialize, Serialize};

use super::chain::MoveChain;
use super::entity::{EntityId, EntityStore, Transform};

/// Something a candidate volume intersects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    World,
    Entity(EntityId),
}

/// Collision collaborator: every overlap of entity `id` if it stood at `at`.
/// The entity never overlaps itself.
pub trait OverlapQuery {
    fn overlaps(&self, store: &dyn EntityStore, id: EntityId, at: Transform) -> Vec<Overlap>;
}

/// Damage/removal collaborator for entities crushed by a mover.
pub trait CrushHandler {
    fn on_crush(&mut self, mover: EntityId, crushed: EntityId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrushEvent {
    pub tick: u64,
    pub mover: u64,
    pub crushed: u64,
}

/// Discards crush notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreCrush;

impl CrushHandler for IgnoreCrush {
    fn on_crush(&mut self, _mover: EntityId, _crushed: EntityId) {}
}

impl CrushHandler for Vec<(EntityId, EntityId)> {
    fn on_crush(&mut self, mover: EntityId, crushed: EntityId) {
        self.push((mover, crushed));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker {
    World,
    Entity(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Clear,
    Blocked(Blocker),
    /// Crushable entities occupying the propagated position, ascending by id.
    Crush(Vec<EntityId>),
}

/// Re-validates `member` at its current, already propagated transform.
///
/// Overlaps with the mover and with members of the same chain are ignored
/// since they move together. Solid world geometry or a non-crushable entity
/// blocks; if only crushable entities are in the way they are crushed.
pub fn resolve_push<Q: OverlapQuery + ?Sized>(
    store: &dyn EntityStore,
    query: &Q,
    mover: EntityId,
    chain: &MoveChain<'_>,
    member: EntityId,
) -> PushOutcome {
    let Some(at) = store.transform(member) else {
        return PushOutcome::Clear;
    };

    let mut victims = Vec::new();
    for overlap in query.overlaps(store, member, at) {
        let other = match overlap {
            Overlap::World => return PushOutcome::Blocked(Blocker::World),
            Overlap::Entity(other) => other,
        };
        if other == mover || other == member || chain.contains(other) {
            continue;
        }
        let Some(entity) = store.entity(other) else {
            continue;
        };
        if !entity.solid {
            continue;
        }
        if !entity.crushable {
            return PushOutcome::Blocked(Blocker::Entity(other));
        }
        victims.push(other);
    }

    if victims.is_empty() {
        PushOutcome::Clear
    } else {
        victims.sort();
        victims.dedup();
        PushOutcome::Crush(victims)
    }
}
