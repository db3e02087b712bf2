use sha2::{Digest, Sha256};

use super::entity::EntityStore;
use super::math::Vec3;

/// SHA-256 over every entity's id and transform bit patterns in ascending id
/// order. Two runs of the same scenario must produce the same digest.
pub fn world_state_hash(store: &dyn EntityStore) -> String {
    let mut hasher = Sha256::new();
    for id in store.entity_ids() {
        let Some(entity) = store.entity(id) else {
            continue;
        };
        hasher.update(id.0.to_le_bytes());
        update_vec3(&mut hasher, entity.transform.origin);
        update_vec3(&mut hasher, entity.transform.angles);
        hasher.update([0u8]);
    }
    to_hex_lower(&hasher.finalize())
}

fn update_vec3(hasher: &mut Sha256, value: Vec3) {
    for component in [value.x, value.y, value.z] {
        hasher.update(component.to_bits().to_le_bytes());
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
