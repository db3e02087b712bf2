use std::process::ExitCode;

use engine::{resolve_scenarios_dir, run_scene, ScenarioDef, ScenarioScene};
use tracing::{error, info, warn};

use super::bootstrap::{AppWiring, ScenarioSource};
use super::scenario_file::{export_run, load_scenario_file, resolve_scenario_path};
use super::scenarios;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let def = match resolve_scenario(&app.source) {
        Ok(def) => def,
        Err(message) => {
            error!(error = %message, "scenario_load_failed");
            return ExitCode::FAILURE;
        }
    };

    let mut scene = ScenarioScene::new(def.clone());
    let summary = match run_scene(app.config, &mut scene) {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "run_failed");
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = app.export_dir.as_deref() {
        match export_run(dir, &def, &summary) {
            Ok((scenario_path, report_path)) => info!(
                scenario_path = %scenario_path.display(),
                report_path = %report_path.display(),
                "run_exported"
            ),
            Err(message) => {
                error!(error = %message, "export_failed");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn resolve_scenario(source: &ScenarioSource) -> Result<ScenarioDef, String> {
    match source {
        ScenarioSource::Builtin(name) => {
            scenarios::builtin(name).ok_or_else(|| format!("unknown built-in scenario '{name}'"))
        }
        ScenarioSource::File(value) => {
            let scenarios_dir = match resolve_scenarios_dir() {
                Ok(dir) => Some(dir),
                Err(err) => {
                    warn!(error = %err, "project_root_unavailable");
                    None
                }
            };
            let path = resolve_scenario_path(value, scenarios_dir.as_deref()).ok_or_else(|| {
                format!(
                    "scenario '{value}' is neither a built-in ({}) nor a readable file",
                    scenarios::BUILTIN_SCENARIOS.join(", ")
                )
            })?;
            info!(path = %path.display(), "scenario_file_selected");
            load_scenario_file(&path)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn builtin_source_resolves_without_files() {
        let def = resolve_scenario(&ScenarioSource::Builtin("elevator")).expect("builtin");
        assert_eq!(def.name, "elevator");
    }

    #[test]
    fn file_source_loads_from_explicit_path() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("door.json");
        let def = scenarios::builtin("rotating_door").expect("builtin");
        fs::write(&path, serde_json::to_string(&def).expect("json")).expect("write");

        let source = ScenarioSource::File(path.display().to_string());
        assert_eq!(resolve_scenario(&source).expect("load"), def);
    }

    #[test]
    fn missing_file_lists_builtins() {
        let source = ScenarioSource::File("/definitely/not/here.json".to_string());
        let error = resolve_scenario(&source).expect_err("missing");
        assert!(error.contains("support_cycle"), "{error}");
    }
}
