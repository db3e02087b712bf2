use thiserror::Error;
use tracing::{debug, warn};

use super::builder::build_chain;
use super::chain::{ArenaStats, ChainArena, ChainError};
use super::config::{BlockPolicy, MoveChainConfig};
use super::entity::{EntityId, EntityStoreMut, Transform};
use super::propagate::{propagate_member, AppliedDelta, MoveDelta};
use super::push::{resolve_push, Blocker, CrushHandler, OverlapQuery, PushOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveChainError {
    #[error("mover {0} is not in the entity store")]
    MoverMissing(EntityId),
    #[error("failed to build chain for mover {mover}: {source}")]
    Chain {
        mover: EntityId,
        #[source]
        source: ChainError,
    },
}

/// Raised when a member could not follow its mover. The caller decides what
/// the mover does about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstructionSignal {
    pub mover: EntityId,
    pub blocked: EntityId,
    pub blocker: Blocker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoverStepReport {
    pub mover: EntityId,
    pub chain_len: usize,
    pub moved: usize,
    pub reverted: usize,
    pub crushed: Vec<EntityId>,
    pub obstruction: Option<ObstructionSignal>,
}

impl MoverStepReport {
    fn empty(mover: EntityId) -> Self {
        Self {
            mover,
            chain_len: 0,
            moved: 0,
            reverted: 0,
            crushed: Vec::new(),
            obstruction: None,
        }
    }

    pub fn is_obstructed(&self) -> bool {
        self.obstruction.is_some()
    }
}

/// A mover's requested transform for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoverIntent {
    pub mover: EntityId,
    pub target: Transform,
    /// Report the blocked member as crushed when the move is obstructed.
    pub crush_on_block: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoverTickOutcome {
    pub mover: EntityId,
    pub mover_reverted: bool,
    pub result: Result<MoverStepReport, MoveChainError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub outcomes: Vec<MoverTickOutcome>,
}

impl TickReport {
    pub fn obstructed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(&outcome.result, Ok(report) if report.is_obstructed()))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }
}

#[derive(Debug)]
pub struct MoveChainSystem {
    arena: ChainArena,
    config: MoveChainConfig,
}

impl Default for MoveChainSystem {
    fn default() -> Self {
        Self::new(MoveChainConfig::default())
    }
}

impl MoveChainSystem {
    pub fn new(config: MoveChainConfig) -> Self {
        Self {
            arena: ChainArena::with_capacity(config.max_chain_len),
            config,
        }
    }

    pub fn config(&self) -> &MoveChainConfig {
        &self.config
    }

    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    /// Carries everything riding `mover` along with the move it already made
    /// from `before` to its current transform.
    ///
    /// Members are moved and re-validated one at a time in discovery order. A
    /// blocked member is put back, the remaining members are left untouched and
    /// the report carries an [`ObstructionSignal`]. Members moved before the
    /// block are handled by the configured [`BlockPolicy`]. The chain is
    /// released on every return path.
    pub fn step_mover<S, Q, H>(
        &mut self,
        store: &mut S,
        query: &Q,
        crush: &mut H,
        mover: EntityId,
        before: MoveDelta,
    ) -> Result<MoverStepReport, MoveChainError>
    where
        S: EntityStoreMut,
        Q: OverlapQuery + ?Sized,
        H: CrushHandler + ?Sized,
    {
        let policy = self.config.block_policy;
        self.step_with_policy(store, query, crush, mover, before, policy)
    }

    fn step_with_policy<S, Q, H>(
        &mut self,
        store: &mut S,
        query: &Q,
        crush: &mut H,
        mover: EntityId,
        before: MoveDelta,
        policy: BlockPolicy,
    ) -> Result<MoverStepReport, MoveChainError>
    where
        S: EntityStoreMut,
        Q: OverlapQuery + ?Sized,
        H: CrushHandler + ?Sized,
    {
        let after = store
            .transform(mover)
            .ok_or(MoveChainError::MoverMissing(mover))?;
        let delta = AppliedDelta::between(before, after);
        let mut report = MoverStepReport::empty(mover);
        if delta.is_zero() && self.config.skip_zero_delta {
            return Ok(report);
        }

        let mut chain = self.arena.acquire();
        build_chain(&*store, mover, &mut chain)
            .map_err(|source| MoveChainError::Chain { mover, source })?;
        report.chain_len = chain.len();
        debug!(mover = mover.0, chain_len = report.chain_len, "chain_built");

        let mut moved = Vec::<(EntityId, Transform)>::with_capacity(chain.len());
        for member in chain.discovery_order() {
            let Some(previous) = propagate_member(store, member, &delta) else {
                continue;
            };

            match resolve_push(&*store, query, mover, &chain, member) {
                PushOutcome::Clear => moved.push((member, previous)),
                PushOutcome::Crush(victims) => {
                    for victim in victims {
                        debug!(mover = mover.0, crushed = victim.0, "member_crushed_entity");
                        crush.on_crush(mover, victim);
                        report.crushed.push(victim);
                    }
                    moved.push((member, previous));
                }
                PushOutcome::Blocked(blocker) => {
                    store.set_transform(member, previous);
                    report.reverted += 1;
                    if policy == BlockPolicy::RevertChain {
                        for (id, transform) in moved.drain(..).rev() {
                            store.set_transform(id, transform);
                            report.reverted += 1;
                        }
                    }
                    report.moved = moved.len();
                    report.obstruction = Some(ObstructionSignal {
                        mover,
                        blocked: member,
                        blocker,
                    });
                    debug!(
                        mover = mover.0,
                        blocked = member.0,
                        blocker = ?blocker,
                        reverted = report.reverted,
                        "mover_obstructed"
                    );
                    return Ok(report);
                }
            }
        }

        report.moved = moved.len();
        debug!(
            mover = mover.0,
            chain_len = report.chain_len,
            moved = report.moved,
            "chain_propagated"
        );
        Ok(report)
    }

    /// Moves each mover to its target in order and carries its riders.
    ///
    /// A mover whose chain is obstructed or fails is put back at its
    /// pre-tick transform together with every rider it had already moved, so
    /// no rider is left displaced from a support that stayed put. Other movers
    /// are unaffected.
    pub fn run_tick<S, Q, H>(
        &mut self,
        store: &mut S,
        query: &Q,
        crush: &mut H,
        intents: &[MoverIntent],
    ) -> TickReport
    where
        S: EntityStoreMut,
        Q: OverlapQuery + ?Sized,
        H: CrushHandler + ?Sized,
    {
        let mut report = TickReport::default();
        for intent in intents {
            let mover = intent.mover;
            let Some(current) = store.transform(mover) else {
                warn!(mover = mover.0, "mover_missing");
                report.outcomes.push(MoverTickOutcome {
                    mover,
                    mover_reverted: false,
                    result: Err(MoveChainError::MoverMissing(mover)),
                });
                continue;
            };

            store.set_transform(mover, intent.target);
            let before = MoveDelta::capture(current);
            let result = self.step_with_policy(
                store,
                query,
                crush,
                mover,
                before,
                BlockPolicy::RevertChain,
            );
            let mover_reverted = match &result {
                Ok(step) => match step.obstruction {
                    Some(signal) => {
                        store.set_transform(mover, current);
                        let blocked_is_crushable = store
                            .entity(signal.blocked)
                            .is_some_and(|entity| entity.crushable);
                        if intent.crush_on_block && blocked_is_crushable {
                            crush.on_crush(mover, signal.blocked);
                        }
                        true
                    }
                    None => false,
                },
                Err(error) => {
                    warn!(mover = mover.0, error = %error, "mover_step_failed");
                    store.set_transform(mover, current);
                    true
                }
            };

            report.outcomes.push(MoverTickOutcome {
                mover,
                mover_reverted,
                result,
            });
        }
        report
    }
}
