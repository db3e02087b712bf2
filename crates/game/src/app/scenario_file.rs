use std::fs;
use std::path::{Path, PathBuf};

use engine::{write_json_atomic, RunSummary, ScenarioDef};
use serde::Serialize;

pub(crate) type ScenarioFileResult<T> = Result<T, String>;

const REPORT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    report_version: u32,
    scenario: &'a str,
    description: &'a str,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

pub(crate) fn parse_scenario_json(raw: &str) -> ScenarioFileResult<ScenarioDef> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, ScenarioDef>(&mut deserializer) {
        Ok(def) => Ok(def),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse scenario json: {source}"))
            } else {
                Err(format!("parse scenario json at {path}: {source}"))
            }
        }
    }
}

pub(crate) fn load_scenario_file(path: &Path) -> ScenarioFileResult<ScenarioDef> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read scenario '{}': {error}", path.display()))?;
    let def = parse_scenario_json(&raw).map_err(|error| format!("{}: {error}", path.display()))?;
    def.validate()
        .map_err(|error| format!("{}: {error}", path.display()))?;
    Ok(def)
}

/// Looks for `value` as given, then with a `.json` extension under
/// `scenarios_dir`.
pub(crate) fn resolve_scenario_path(value: &str, scenarios_dir: Option<&Path>) -> Option<PathBuf> {
    let direct = PathBuf::from(value);
    if direct.is_file() {
        return Some(direct);
    }
    let scenarios_dir = scenarios_dir?;
    [value.to_string(), format!("{value}.json")]
        .into_iter()
        .map(|candidate| scenarios_dir.join(candidate))
        .find(|candidate| candidate.is_file())
}

/// Writes the scenario definition and its run report side by side and returns
/// both paths.
pub(crate) fn export_run(
    dir: &Path,
    def: &ScenarioDef,
    summary: &RunSummary,
) -> ScenarioFileResult<(PathBuf, PathBuf)> {
    let scenario_path = dir.join(format!("{}.scenario.json", def.name));
    write_json_atomic(&scenario_path, "scenario", def).map_err(|error| error.to_string())?;

    let report_path = dir.join(format!("{}.report.json", def.name));
    let report = RunReport {
        report_version: REPORT_VERSION,
        scenario: &def.name,
        description: &def.description,
        summary,
    };
    write_json_atomic(&report_path, "run report", &report).map_err(|error| error.to_string())?;

    Ok((scenario_path, report_path))
}
