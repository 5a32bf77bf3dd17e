//! Build lifecycle state model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A state string the server reported that is not part of the build lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown build state '{0}'")]
pub struct UnknownBuildState(pub String);

/// Lifecycle of a single build on the server
///
/// Transitions only move forward: `Queued -> Running -> Finished`, or
/// `Queued -> Finished` when a build is cancelled before an agent picks it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildLifecycleState {
    /// Waiting in the build queue
    Queued,
    /// Running on an agent
    Running,
    /// Finished (successfully, failed or cancelled)
    Finished,
}

impl BuildLifecycleState {
    /// All valid states, in lifecycle order
    pub const ALL: [BuildLifecycleState; 3] = [
        BuildLifecycleState::Queued,
        BuildLifecycleState::Running,
        BuildLifecycleState::Finished,
    ];

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildLifecycleState::Queued => "queued",
            BuildLifecycleState::Running => "running",
            BuildLifecycleState::Finished => "finished",
        }
    }

    /// Check if the build can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildLifecycleState::Finished)
    }

    /// Check whether moving from `self` to `next` respects the lifecycle order
    pub fn can_transition_to(&self, next: BuildLifecycleState) -> bool {
        *self <= next
    }
}

impl fmt::Display for BuildLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildLifecycleState {
    type Err = UnknownBuildState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(BuildLifecycleState::Queued),
            "running" => Ok(BuildLifecycleState::Running),
            "finished" => Ok(BuildLifecycleState::Finished),
            _ => Err(UnknownBuildState(s.to_string())),
        }
    }
}

/// Format a set of states for messages, e.g. `running|finished`
pub fn format_states(states: &[BuildLifecycleState]) -> String {
    states
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("|")
}
