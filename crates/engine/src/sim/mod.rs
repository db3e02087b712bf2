//! Mover chain propagation: discovering riders, carrying them with a mover and
//! resolving what they bump into.

mod builder;
mod chain;
mod collision;
mod config;
mod entity;
mod hashing;
mod math;
mod mover;
mod propagate;
mod push;
#[cfg(test)]
mod test_support;

pub use builder::{build_chain, build_chain_from_snapshot, SupportSnapshot};
pub use chain::{
    ArenaStats, ChainArena, ChainError, LinkIter, LinkedElement, MoveChain, DEFAULT_CHAIN_CAPACITY,
};
pub use collision::{BoxCollision, StaticSolid};
pub use config::{BlockPolicy, MoveChainConfig, MAX_CHAIN_LEN_ENV_VAR};
pub use entity::{
    Bounds, Entity, EntityId, EntityIdAllocator, EntityStore, EntityStoreMut, EntityWorld,
    Transform,
};
pub use hashing::world_state_hash;
pub use math::{Basis, Vec3};
pub use mover::{
    MoveChainError, MoveChainSystem, MoverIntent, MoverStepReport, MoverTickOutcome,
    ObstructionSignal, TickReport,
};
pub use propagate::{propagate_chain, propagate_member, AppliedDelta, MoveDelta};
pub use push::{
    resolve_push, Blocker, CrushEvent, CrushHandler, IgnoreCrush, Overlap, OverlapQuery,
    PushOutcome,
};
