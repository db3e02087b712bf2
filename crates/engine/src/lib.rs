use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod scenario;
pub mod sim;

pub use app::{
    run_scene, run_scene_with_metrics, AppError, ChainMetricsSnapshot, LoopConfig, MetricsHandle,
    MoverMotion, RunSummary, Scene, SceneCommand, SceneWorld,
};
pub use scenario::{
    write_json_atomic, EntityDef, MotionDef, ScenarioDef, ScenarioError, ScenarioScene,
    SCENARIO_FORMAT_VERSION,
};

pub const ROOT_ENV_VAR: &str = "MOVECHAIN_ROOT";
const SCENARIOS_DIR_NAME: &str = "scenarios";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("{var} does not point at a movechain checkout: {path}")]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
    #[error("no movechain checkout above {start}; set {var} to the repository root")]
    RootNotFound { start: PathBuf, var: &'static str },
}

/// Locates the bundled `scenarios/` directory of the checkout this binary runs
/// from, or of `MOVECHAIN_ROOT` when set. Nothing is created on disk.
pub fn resolve_scenarios_dir() -> Result<PathBuf, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => checkout_root_at(Path::new(&value))?,
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            find_checkout_root(&exe).ok_or_else(|| StartupError::RootNotFound {
                start: exe,
                var: ROOT_ENV_VAR,
            })?
        }
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    Ok(root.join(SCENARIOS_DIR_NAME))
}

fn checkout_root_at(path: &Path) -> Result<PathBuf, StartupError> {
    let root = canonical(path);
    if is_checkout_root(&root) {
        Ok(root)
    } else {
        Err(StartupError::InvalidEnvRoot {
            var: ROOT_ENV_VAR,
            path: root,
        })
    }
}

fn find_checkout_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_checkout_root(candidate))
        .map(canonical)
}

fn is_checkout_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file()
        && (path.join("crates").is_dir() || path.join(SCENARIOS_DIR_NAME).is_dir())
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
