//! Wait failure types

use crate::api::ApiError;
use crate::core::state::{format_states, BuildLifecycleState};
use std::time::Duration;
use thiserror::Error;

/// Error types for wait operations
#[derive(Debug, Error)]
pub enum WaitError {
    /// The condition never held within the attempt budget
    #[error("{title}: condition not met after {max_attempts} attempts")]
    RetryExhausted { title: String, max_attempts: u32 },

    /// The condition held but the entity was missing from the same listing
    #[error("{title}: '{target}' matched the listing but could not be found in it")]
    EntityNotFound { title: String, target: String },

    #[error("{title}: build {build_id} reported unexpected state '{state}'")]
    UnexpectedBuildState {
        title: String,
        build_id: u64,
        state: String,
    },

    #[error("{title}: build {build_id} did not finish within {}s", .timeout.as_secs_f64())]
    BuildWaitTimeout {
        title: String,
        build_id: u64,
        timeout: Duration,
    },

    #[error(
        "{title}: build {build_id} did not reach {} within {}s",
        format_states(.expected),
        .timeout.as_secs_f64()
    )]
    BuildStateTimeout {
        title: String,
        build_id: u64,
        expected: Vec<BuildLifecycleState>,
        timeout: Duration,
    },

    #[error(
        "{title}: no build of type '{build_type_id}' found in queue or history within {}s",
        .timeout.as_secs_f64()
    )]
    NoBuildFound {
        title: String,
        build_type_id: String,
        timeout: Duration,
    },

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl WaitError {
    /// Failures that mean the server is not ready yet rather than broken
    ///
    /// Callers may turn these into a skip instead of a failure.
    pub fn is_not_ready(&self) -> bool {
        match self {
            WaitError::RetryExhausted { .. } | WaitError::NoBuildFound { .. } => true,
            WaitError::Api(e) => e.is_unreachable(),
            _ => false,
        }
    }

    /// Timeout-class failures
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WaitError::RetryExhausted { .. }
                | WaitError::BuildWaitTimeout { .. }
                | WaitError::BuildStateTimeout { .. }
                | WaitError::NoBuildFound { .. }
        )
    }
}
