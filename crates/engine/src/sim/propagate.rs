use super::chain::MoveChain;
use super::entity::{EntityId, EntityStoreMut, Transform};
use super::math::{Basis, Vec3};

/// Mover transform captured before the mover itself is moved this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveDelta {
    pub origin_before: Vec3,
    pub angles_before: Vec3,
}

impl MoveDelta {
    pub fn capture(transform: Transform) -> Self {
        Self {
            origin_before: transform.origin,
            angles_before: transform.angles,
        }
    }

    pub fn as_transform(&self) -> Transform {
        Transform {
            origin: self.origin_before,
            angles: self.angles_before,
        }
    }
}

/// Rigid motion shared by every member of a chain.
///
/// Members swing about the mover's pre-move origin:
/// `p' = origin_after + B(angles_after) * B(angles_before)^T * (p - origin_before)`
/// and gain the mover's angle delta. Without an angle delta the member origin
/// is offset by the translation alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedDelta {
    before: Transform,
    after: Transform,
    translation: Vec3,
    rotation: Vec3,
    basis_before: Basis,
    basis_after: Basis,
}

impl AppliedDelta {
    pub fn between(before: MoveDelta, after: Transform) -> Self {
        let before = before.as_transform();
        Self {
            before,
            after,
            translation: after.origin - before.origin,
            rotation: after.angles - before.angles,
            basis_before: Basis::from_angles(before.angles),
            basis_after: Basis::from_angles(after.angles),
        }
    }

    pub fn from_translation(offset: Vec3) -> Self {
        Self::between(
            MoveDelta::capture(Transform::default()),
            Transform::at(offset),
        )
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn is_zero(&self) -> bool {
        self.translation.is_zero() && self.rotation.is_zero()
    }

    pub fn is_rotating(&self) -> bool {
        !self.rotation.is_zero()
    }

    pub fn inverse(&self) -> Self {
        Self::between(MoveDelta::capture(self.after), self.before)
    }

    pub fn apply(&self, transform: Transform) -> Transform {
        if self.is_zero() {
            return transform;
        }
        if !self.is_rotating() {
            return Transform {
                origin: transform.origin + self.translation,
                angles: transform.angles,
            };
        }

        let local = self
            .basis_before
            .to_local(transform.origin - self.before.origin);
        Transform {
            origin: self.after.origin + self.basis_after.to_world(local),
            angles: transform.angles + self.rotation,
        }
    }
}

/// Moves a single member and returns its transform from before the move.
pub fn propagate_member<S: EntityStoreMut + ?Sized>(
    store: &mut S,
    member: EntityId,
    delta: &AppliedDelta,
) -> Option<Transform> {
    let entity = store.entity_mut(member)?;
    let previous = entity.transform;
    entity.transform = delta.apply(previous);
    Some(previous)
}

/// Applies `delta` to every member in discovery order and returns how many
/// members were moved.
pub fn propagate_chain<S: EntityStoreMut + ?Sized>(
    chain: &MoveChain<'_>,
    store: &mut S,
    delta: &AppliedDelta,
) -> usize {
    if delta.is_zero() {
        return 0;
    }
    chain
        .discovery_order()
        .filter(|&member| propagate_member(store, member, delta).is_some())
        .count()
}
