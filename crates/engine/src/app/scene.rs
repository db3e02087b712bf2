use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use tracing::info;

use crate::sim::{
    world_state_hash, ArenaStats, Bounds, BoxCollision, CrushEvent, CrushHandler, EntityId,
    EntityStore, EntityWorld, MoveChainConfig, MoveChainSystem, MoverIntent, StaticSolid,
    TickReport, Transform, Vec3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Stop,
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld) -> Result<(), crate::ScenarioError>;
    fn update(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

/// Scripted motion for a mover, in units and degrees per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoverMotion {
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Reverse direction after this many unobstructed ticks.
    pub travel_ticks: Option<u32>,
    pub crush_on_block: bool,
    pub reverse_on_block: bool,
}

#[derive(Debug, Clone, Copy)]
struct MoverState {
    motion: MoverMotion,
    direction: f32,
    ticks_in_leg: u32,
}

impl MoverState {
    fn new(motion: MoverMotion) -> Self {
        Self {
            motion,
            direction: 1.0,
            ticks_in_leg: 0,
        }
    }

    fn target(&self, current: Transform, fixed_dt_seconds: f32) -> Transform {
        let scale = self.direction * fixed_dt_seconds;
        Transform {
            origin: current.origin + self.motion.linear_velocity * scale,
            angles: current.angles + self.motion.angular_velocity * scale,
        }
    }

    fn reverse(&mut self) {
        self.direction = -self.direction;
        self.ticks_in_leg = 0;
    }
}

/// A `(mover, crushed)` pair that was already crushed on the previous tick is
/// still pinned and is not logged again.
struct CrushRecorder<'a> {
    tick: u64,
    log: &'a mut Vec<CrushEvent>,
    pinned_before: &'a BTreeSet<(EntityId, EntityId)>,
    pinned_now: BTreeSet<(EntityId, EntityId)>,
    crushed: Vec<EntityId>,
}

impl CrushHandler for CrushRecorder<'_> {
    fn on_crush(&mut self, mover: EntityId, crushed: EntityId) {
        if !self.pinned_now.insert((mover, crushed)) {
            return;
        }
        self.crushed.push(crushed);
        if self.pinned_before.contains(&(mover, crushed)) {
            return;
        }
        info!(tick = self.tick, mover = mover.0, crushed = crushed.0, "entity_crushed");
        self.log.push(CrushEvent {
            tick: self.tick,
            mover: mover.0,
            crushed: crushed.0,
        });
    }
}

/// Entities, static geometry and scripted movers for one headless run.
#[derive(Debug)]
pub struct SceneWorld {
    entities: EntityWorld,
    collision: BoxCollision,
    movers: BTreeMap<EntityId, MoverState>,
    chain_system: MoveChainSystem,
    crush_log: Vec<CrushEvent>,
    pinned: BTreeSet<(EntityId, EntityId)>,
    despawn_crushed: bool,
    tick: u64,
    last_tick_report: TickReport,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new(MoveChainConfig::default())
    }
}

impl SceneWorld {
    pub fn new(config: MoveChainConfig) -> Self {
        Self {
            entities: EntityWorld::default(),
            collision: BoxCollision::default(),
            movers: BTreeMap::new(),
            chain_system: MoveChainSystem::new(config),
            crush_log: Vec::new(),
            pinned: BTreeSet::new(),
            despawn_crushed: false,
            tick: 0,
            last_tick_report: TickReport::default(),
        }
    }

    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        bounds: Bounds,
    ) -> EntityId {
        self.entities.spawn(name, transform, bounds)
    }

    pub fn spawn_crushable(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        bounds: Bounds,
    ) -> EntityId {
        self.entities.spawn_crushable(name, transform, bounds)
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.entities.despawn(id)
    }

    pub fn apply_pending(&mut self) {
        self.entities.apply_pending();
        let entities = &self.entities;
        self.movers.retain(|id, _| entities.contains(*id));
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.collision = BoxCollision::default();
        self.movers.clear();
        self.crush_log.clear();
        self.pinned.clear();
        self.tick = 0;
        self.last_tick_report = TickReport::default();
    }

    pub fn entities(&self) -> &EntityWorld {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityWorld {
        &mut self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.entity_count()
    }

    pub fn add_solid(&mut self, solid: StaticSolid) {
        self.collision.add_solid(solid);
    }

    pub fn collision(&self) -> &BoxCollision {
        &self.collision
    }

    pub fn set_motion(&mut self, mover: EntityId, motion: MoverMotion) {
        self.movers.insert(mover, MoverState::new(motion));
    }

    pub fn motion(&self, mover: EntityId) -> Option<&MoverMotion> {
        self.movers.get(&mover).map(|state| &state.motion)
    }

    pub fn mover_count(&self) -> usize {
        self.movers.len()
    }

    pub fn set_despawn_crushed(&mut self, despawn_crushed: bool) {
        self.despawn_crushed = despawn_crushed;
    }

    pub fn crush_log(&self) -> &[CrushEvent] {
        &self.crush_log
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn chain_config(&self) -> &MoveChainConfig {
        self.chain_system.config()
    }

    pub fn arena_stats(&self) -> ArenaStats {
        self.chain_system.arena_stats()
    }

    pub fn state_hash(&self) -> String {
        world_state_hash(&self.entities)
    }

    /// Hands out the report of the most recent [`SceneWorld::advance_movers`]
    /// call, leaving an empty one in its place.
    pub fn take_tick_report(&mut self) -> TickReport {
        mem::take(&mut self.last_tick_report)
    }

    /// Moves every scripted mover by one fixed step in ascending id order and
    /// carries their riders.
    pub fn advance_movers(&mut self, fixed_dt_seconds: f32) -> &TickReport {
        self.tick = self.tick.saturating_add(1);

        let mut intents = Vec::with_capacity(self.movers.len());
        for (&mover, state) in &self.movers {
            let Some(current) = self.entities.transform(mover) else {
                continue;
            };
            let target = state.target(current, fixed_dt_seconds);
            if target == current {
                continue;
            }
            intents.push(MoverIntent {
                mover,
                target,
                crush_on_block: state.motion.crush_on_block,
            });
        }

        let mut recorder = CrushRecorder {
            tick: self.tick,
            log: &mut self.crush_log,
            pinned_before: &self.pinned,
            pinned_now: BTreeSet::new(),
            crushed: Vec::new(),
        };
        let report =
            self.chain_system
                .run_tick(&mut self.entities, &self.collision, &mut recorder, &intents);
        let CrushRecorder {
            pinned_now,
            crushed,
            ..
        } = recorder;
        self.pinned = pinned_now;

        for outcome in &report.outcomes {
            let Some(state) = self.movers.get_mut(&outcome.mover) else {
                continue;
            };
            if outcome.mover_reverted {
                if state.motion.reverse_on_block {
                    state.reverse();
                }
                continue;
            }
            state.ticks_in_leg = state.ticks_in_leg.saturating_add(1);
            if state
                .motion
                .travel_ticks
                .is_some_and(|travel| state.ticks_in_leg >= travel)
            {
                state.reverse();
            }
        }

        if self.despawn_crushed {
            for id in crushed {
                self.entities.despawn(id);
            }
        }

        self.last_tick_report = report;
        &self.last_tick_report
    }
}
