use std::env;
use std::path::PathBuf;

use engine::sim::MoveChainConfig;
use engine::LoopConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::scenarios::{self, DEFAULT_SCENARIO};

pub(crate) const SCENARIO_ENV_VAR: &str = "MOVECHAIN_SCENARIO";
pub(crate) const TICKS_ENV_VAR: &str = "MOVECHAIN_TICKS";
pub(crate) const EXPORT_DIR_ENV_VAR: &str = "MOVECHAIN_EXPORT_DIR";
pub(crate) const REALTIME_ENV_VAR: &str = "MOVECHAIN_REALTIME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScenarioSource {
    Builtin(&'static str),
    File(String),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) source: ScenarioSource,
    pub(crate) export_dir: Option<PathBuf>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== movechain startup ===");

    let source = parse_scenario_source(env::var(SCENARIO_ENV_VAR).ok().as_deref());
    let config = LoopConfig {
        max_ticks: parse_ticks(env::var(TICKS_ENV_VAR).ok().as_deref()),
        realtime: env::var(REALTIME_ENV_VAR).is_ok_and(|raw| is_truthy(&raw)),
        chain: MoveChainConfig::default().with_env_overrides(),
        ..LoopConfig::default()
    };
    let export_dir = env::var_os(EXPORT_DIR_ENV_VAR)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from);

    info!(
        source = ?source,
        max_ticks = ?config.max_ticks,
        realtime = config.realtime,
        export_dir = ?export_dir,
        "app_wired"
    );
    AppWiring {
        config,
        source,
        export_dir,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_scenario_source(raw: Option<&str>) -> ScenarioSource {
    let value = raw.map(str::trim).filter(|value| !value.is_empty());
    let Some(value) = value else {
        return ScenarioSource::Builtin(DEFAULT_SCENARIO);
    };
    match scenarios::BUILTIN_SCENARIOS
        .iter()
        .find(|name| **name == value)
    {
        Some(name) => ScenarioSource::Builtin(*name),
        None => ScenarioSource::File(value.to_string()),
    }
}

/// `0` or `none` runs until the scenario stops itself; garbage falls back to
/// the loop default.
fn parse_ticks(raw: Option<&str>) -> Option<u64> {
    let default = LoopConfig::default().max_ticks;
    let Some(raw) = raw.map(str::trim) else {
        return default;
    };
    if raw.eq_ignore_ascii_case("none") {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(ticks) => Some(ticks),
        Err(_) => {
            warn!(
                env_var = TICKS_ENV_VAR,
                value = raw,
                "invalid tick count env var value; falling back to config"
            );
            default
        }
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_scenario_uses_default_builtin() {
        assert_eq!(
            parse_scenario_source(None),
            ScenarioSource::Builtin(DEFAULT_SCENARIO)
        );
        assert_eq!(
            parse_scenario_source(Some("  ")),
            ScenarioSource::Builtin(DEFAULT_SCENARIO)
        );
    }

    #[test]
    fn builtin_names_win_over_files() {
        assert_eq!(
            parse_scenario_source(Some(" crusher ")),
            ScenarioSource::Builtin("crusher")
        );
        assert_eq!(
            parse_scenario_source(Some("levels/lift.json")),
            ScenarioSource::File("levels/lift.json".to_string())
        );
    }

    #[test]
    fn tick_parsing_handles_unbounded_and_garbage() {
        let default = LoopConfig::default().max_ticks;
        assert_eq!(parse_ticks(None), default);
        assert_eq!(parse_ticks(Some("120")), Some(120));
        assert_eq!(parse_ticks(Some("0")), None);
        assert_eq!(parse_ticks(Some("None")), None);
        assert_eq!(parse_ticks(Some("soon")), default);
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" TRUE "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }
}
