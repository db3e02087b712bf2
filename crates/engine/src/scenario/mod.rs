mod atomic_io;
mod build;
mod types;

pub use atomic_io::write_json_atomic;
pub use build::ScenarioScene;
pub use types::{EntityDef, MotionDef, ScenarioDef, ScenarioError, SCENARIO_FORMAT_VERSION};
