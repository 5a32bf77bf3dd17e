//! CLI command definitions

use crate::core::state::BuildLifecycleState;
use clap::Args;

/// Wait for a build to finish
#[derive(Debug, Args, Clone)]
pub struct WaitBuildCommand {
    /// Build id
    pub build_id: u64,

    /// Overall budget in seconds (defaults to the config value)
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Seconds between polls (defaults to the config value)
    #[arg(long)]
    pub poll_interval: Option<f64>,
}

/// Wait for a build to reach one of the given states
#[derive(Debug, Args, Clone)]
pub struct WaitStateCommand {
    /// Build id
    pub build_id: u64,

    /// Target state; repeat for several
    #[arg(short, long = "state", value_enum, required = true)]
    pub states: Vec<StateArg>,

    /// Overall budget in seconds (defaults to the config value)
    #[arg(long)]
    pub timeout: Option<f64>,
}

/// Find the newest build of a build type and wait for it to finish
#[derive(Debug, Args, Clone)]
pub struct WaitLatestCommand {
    /// Build type (configuration) id
    pub build_type: String,

    /// Overall budget in seconds (defaults to the config value)
    #[arg(long)]
    pub timeout: Option<f64>,
}

/// Wait for an entity to appear in its listing
#[derive(Debug, Args, Clone)]
pub struct WaitEntityCommand {
    /// Project id or username
    pub id: String,

    /// Number of listing attempts (defaults to the config value)
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Seconds between attempts (defaults to the config value)
    #[arg(long)]
    pub delay: Option<f64>,
}

/// Queue a build
#[derive(Debug, Args, Clone)]
pub struct TriggerCommand {
    /// Build type (configuration) id
    pub build_type: String,

    /// Build parameters (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub param: Vec<(String, String)>,

    /// Wait for the build to finish
    #[arg(long)]
    pub wait: bool,
}

/// List build agents
#[derive(Debug, Args, Clone)]
pub struct AgentsCommand {
    /// Include unauthorized agents
    #[arg(long)]
    pub all: bool,
}

/// Delete every project except the root project
#[derive(Debug, Args, Clone)]
pub struct CleanupProjectsCommand {
    /// Only show what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

/// Lifecycle state argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StateArg {
    Queued,
    Running,
    Finished,
}

impl From<StateArg> for BuildLifecycleState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Queued => BuildLifecycleState::Queued,
            StateArg::Running => BuildLifecycleState::Running,
            StateArg::Finished => BuildLifecycleState::Finished,
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}

/// Parse a positive number of seconds
pub fn parse_seconds(value: f64) -> Result<std::time::Duration, String> {
    std::time::Duration::try_from_secs_f64(value)
        .map_err(|e| format!("Invalid number of seconds {}: {}", value, e))
}
