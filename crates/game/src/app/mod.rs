mod bootstrap;
mod loop_runner;
mod scenario_file;
mod scenarios;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
