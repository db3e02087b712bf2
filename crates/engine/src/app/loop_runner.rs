use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::sim::{CrushEvent, MoveChainConfig};
use crate::ScenarioError;

use super::metrics::MetricsAccumulator;
use super::{ChainMetricsSnapshot, MetricsHandle, Scene, SceneCommand, SceneWorld};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    /// Stop after this many ticks. `None` runs until the scene asks to stop.
    pub max_ticks: Option<u64>,
    /// Sleep between ticks so the run advances at `target_tps` in wall time.
    pub realtime: bool,
    pub metrics_log_interval_ticks: u64,
    pub chain: MoveChainConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: Some(600),
            realtime: false,
            metrics_log_interval_ticks: 60,
            chain: MoveChainConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load scene: {0}")]
    SceneLoad(#[from] ScenarioError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks_run: u64,
    pub stopped_by_scene: bool,
    pub entity_count: usize,
    pub final_state_hash: String,
    pub totals: ChainMetricsSnapshot,
    pub crush_events: Vec<CrushEvent>,
    pub arena_nodes_allocated: u64,
    pub arena_nodes_released: u64,
}

pub fn run_scene(config: LoopConfig, scene: &mut dyn Scene) -> Result<RunSummary, AppError> {
    run_scene_with_metrics(config, scene, MetricsHandle::default())
}

pub fn run_scene_with_metrics(
    config: LoopConfig,
    scene: &mut dyn Scene,
    metrics_handle: MetricsHandle,
) -> Result<RunSummary, AppError> {
    let target_tps = config.target_tps.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    let mut world = SceneWorld::new(config.chain);
    scene.load(&mut world)?;
    world.apply_pending();
    info!(
        title = scene.debug_title(&world).as_deref().unwrap_or("untitled"),
        entity_count = world.entity_count(),
        mover_count = world.mover_count(),
        "scene_loaded"
    );
    info!(
        target_tps,
        max_ticks = ?config.max_ticks,
        realtime = config.realtime,
        metrics_log_interval_ticks = config.metrics_log_interval_ticks,
        max_chain_len = config.chain.max_chain_len,
        block_policy = ?config.chain.block_policy,
        "loop_config"
    );

    let mut metrics_accumulator = MetricsAccumulator::new(config.metrics_log_interval_ticks);
    let mut ticks_run = 0u64;
    let mut stopped_by_scene = false;

    while config.max_ticks.map_or(true, |max| ticks_run < max) {
        let tick_start = Instant::now();
        let command = scene.update(fixed_dt_seconds, &mut world);
        world.apply_pending();
        metrics_accumulator.record_tick(&world.take_tick_report());
        ticks_run = ticks_run.saturating_add(1);

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot() {
            metrics_handle.publish(snapshot);
            info!(
                ticks = snapshot.ticks,
                chains_built = snapshot.chains_built,
                members_moved = snapshot.members_moved,
                obstructed = snapshot.obstructed,
                crushed = snapshot.crushed,
                failures = snapshot.failures,
                max_chain_len = snapshot.max_chain_len,
                entity_count = world.entity_count(),
                "chain_metrics"
            );
        }

        if command == SceneCommand::Stop {
            stopped_by_scene = true;
            info!(tick = ticks_run, "scene_stop_requested");
            break;
        }

        if config.realtime {
            let sleep = compute_tick_sleep(tick_start.elapsed(), fixed_dt);
            if sleep > Duration::ZERO {
                thread::sleep(sleep);
            }
        }
    }

    let arena = world.arena_stats();
    let summary = RunSummary {
        ticks_run,
        stopped_by_scene,
        entity_count: world.entity_count(),
        final_state_hash: world.state_hash(),
        totals: metrics_accumulator.totals(),
        crush_events: world.crush_log().to_vec(),
        arena_nodes_allocated: arena.allocated,
        arena_nodes_released: arena.released,
    };
    scene.unload(&mut world);
    info!(
        ticks_run = summary.ticks_run,
        stopped_by_scene = summary.stopped_by_scene,
        crush_events = summary.crush_events.len(),
        state_hash = summary.final_state_hash.as_str(),
        "shutdown"
    );
    Ok(summary)
}

fn compute_tick_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::MoverMotion;
    use crate::sim::{Bounds, EntityStore, Transform, Vec3};

    #[derive(Default)]
    struct LiftScene {
        stop_after: Option<u64>,
        updates: u64,
        unloaded: bool,
    }

    impl Scene for LiftScene {
        fn load(&mut self, world: &mut SceneWorld) -> Result<(), ScenarioError> {
            let plat = world.spawn(
                "plat",
                Transform::default(),
                Bounds::new(Vec3::new(-32.0, -32.0, -8.0), Vec3::new(32.0, 32.0, 0.0)),
            );
            let rider = world.spawn(
                "rider",
                Transform::default(),
                Bounds::new(Vec3::new(-8.0, -8.0, 0.0), Vec3::new(8.0, 8.0, 16.0)),
            );
            world.apply_pending();
            world.entities_mut().set_ground_entity(rider, Some(plat));
            world.set_motion(
                plat,
                MoverMotion {
                    linear_velocity: Vec3::new(0.0, 0.0, 60.0),
                    ..MoverMotion::default()
                },
            );
            Ok(())
        }

        fn update(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand {
            self.updates += 1;
            world.advance_movers(fixed_dt_seconds);
            if self.stop_after == Some(self.updates) {
                SceneCommand::Stop
            } else {
                SceneCommand::None
            }
        }

        fn unload(&mut self, _world: &mut SceneWorld) {
            self.unloaded = true;
        }
    }

    struct BrokenScene;

    impl Scene for BrokenScene {
        fn load(&mut self, _world: &mut SceneWorld) -> Result<(), ScenarioError> {
            Err(ScenarioError::Validation {
                path: "entities".to_string(),
                message: "empty".to_string(),
            })
        }

        fn update(&mut self, _fixed_dt_seconds: f32, _world: &mut SceneWorld) -> SceneCommand {
            SceneCommand::None
        }

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    fn config(max_ticks: u64) -> LoopConfig {
        LoopConfig {
            max_ticks: Some(max_ticks),
            metrics_log_interval_ticks: 10,
            ..LoopConfig::default()
        }
    }

    #[test]
    fn runs_until_max_ticks() {
        let mut scene = LiftScene::default();
        let summary = run_scene(config(30), &mut scene).expect("run");

        assert_eq!(summary.ticks_run, 30);
        assert!(!summary.stopped_by_scene);
        assert!(scene.unloaded);
        assert_eq!(summary.totals.ticks, 30);
        assert_eq!(summary.totals.chains_built, 30);
        assert_eq!(summary.totals.members_moved, 30);
        assert_eq!(summary.arena_nodes_allocated, summary.arena_nodes_released);
    }

    #[test]
    fn scene_stop_ends_the_run_early() {
        let mut scene = LiftScene {
            stop_after: Some(5),
            ..LiftScene::default()
        };
        let summary = run_scene(config(100), &mut scene).expect("run");

        assert_eq!(summary.ticks_run, 5);
        assert!(summary.stopped_by_scene);
    }

    #[test]
    fn metrics_handle_sees_last_interval() {
        let handle = MetricsHandle::default();
        let mut scene = LiftScene::default();
        run_scene_with_metrics(config(20), &mut scene, handle.clone()).expect("run");

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.ticks, 10);
        assert_eq!(snapshot.max_chain_len, 1);
    }

    #[test]
    fn identical_runs_finish_in_identical_states() {
        let first = run_scene(config(45), &mut LiftScene::default()).expect("first");
        let second = run_scene(config(45), &mut LiftScene::default()).expect("second");
        assert_eq!(first.final_state_hash, second.final_state_hash);
    }

    #[test]
    fn load_failure_is_reported() {
        let error = run_scene(config(10), &mut BrokenScene).expect_err("load should fail");
        assert!(matches!(error, AppError::SceneLoad(_)));
    }

    #[test]
    fn tick_sleep_zero_when_over_budget() {
        let sleep = compute_tick_sleep(Duration::from_millis(20), Duration::from_millis(16));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn tick_sleep_positive_when_under_budget() {
        let sleep = compute_tick_sleep(Duration::from_millis(10), Duration::from_millis(16));
        assert_eq!(sleep, Duration::from_millis(6));
    }

    #[test]
    fn lift_scene_rider_follows_platform() {
        let mut world = SceneWorld::default();
        let mut scene = LiftScene::default();
        scene.load(&mut world).expect("load");
        world.apply_pending();
        scene.update(0.5, &mut world);

        let rider = world.entities().find_by_name("rider").expect("rider").id;
        assert_eq!(world.entities().transform(rider).expect("rider").origin.z, 30.0);
    }
}
