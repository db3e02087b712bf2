mod loop_runner;
mod metrics;
mod scene;

pub use loop_runner::{run_scene, run_scene_with_metrics, AppError, LoopConfig, RunSummary};
pub use metrics::{ChainMetricsSnapshot, MetricsHandle};
pub use scene::{MoverMotion, Scene, SceneCommand, SceneWorld};
