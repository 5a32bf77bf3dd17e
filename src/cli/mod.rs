//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    AgentsCommand, CleanupProjectsCommand, TriggerCommand, WaitBuildCommand, WaitEntityCommand,
    WaitLatestCommand, WaitStateCommand,
};
use std::ffi::OsString;
use std::path::PathBuf;

/// Operator tool for a CI server's REST API
#[derive(Debug, Parser, Clone)]
#[command(name = "harness")]
#[command(version)]
#[command(about = "Trigger builds and wait on CI server state over REST", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the harness configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Wait for a build to finish
    WaitBuild(WaitBuildCommand),

    /// Wait for a build to reach a given state
    WaitState(WaitStateCommand),

    /// Find the newest build of a build type and wait for it
    WaitLatest(WaitLatestCommand),

    /// Wait for a project to appear
    WaitProject(WaitEntityCommand),

    /// Wait for a user to appear
    WaitUser(WaitEntityCommand),

    /// Queue a build
    Trigger(TriggerCommand),

    /// List build agents
    Agents(AgentsCommand),

    /// Delete every project except the root project
    CleanupProjects(CleanupProjectsCommand),

    /// Load and validate the configuration
    CheckConfig,
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::StateArg;

    #[test]
    fn test_parse_wait_state() {
        let cli = Cli::try_parse_from([
            "harness", "wait-state", "42", "--state", "running", "--state", "finished",
        ])
        .unwrap();
        match cli.command {
            Command::WaitState(cmd) => {
                assert_eq!(cmd.build_id, 42);
                assert_eq!(cmd.states, vec![StateArg::Running, StateArg::Finished]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_trigger_with_params() {
        let cli = Cli::try_parse_from([
            "harness", "-v", "trigger", "Proj_Build", "--param", "env.X=1", "--wait",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Trigger(cmd) => {
                assert_eq!(cmd.build_type, "Proj_Build");
                assert_eq!(cmd.param, vec![("env.X".to_string(), "1".to_string())]);
                assert!(cmd.wait);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_wait_state_requires_a_state() {
        assert!(Cli::try_parse_from(["harness", "wait-state", "42"]).is_err());
    }
}
