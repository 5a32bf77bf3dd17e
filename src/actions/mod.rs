//! Operation layers over the REST seam
//!
//! Each layer wraps a `CiServerApi`, checks that the server's answer is
//! consistent with what was asked for, and records anything it creates in
//! the caller's `RunContext`.

pub mod admin;
pub mod agents;
pub mod builds;

pub use admin::AdminActions;
pub use agents::AgentActions;
pub use builds::BuildActions;

use crate::api::ApiError;
use crate::wait::WaitError;
use thiserror::Error;

/// Result alias for action calls
pub type ActionResult<T> = Result<T, ActionError>;

/// Error types for actions
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Wait failed: {0}")]
    Wait(#[from] WaitError),

    /// The server answered, but not with what the request implies
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl ActionError {
    /// See `WaitError::is_not_ready`
    pub fn is_not_ready(&self) -> bool {
        match self {
            ActionError::Api(e) => e.is_unreachable(),
            ActionError::Wait(e) => e.is_not_ready(),
            ActionError::Unexpected(_) => false,
        }
    }
}

/// Check that the server refused a call and said `expected_message`
///
/// Returns the server's error so callers can look at it further.
pub fn expect_rejection<T: std::fmt::Debug>(
    what: &str,
    result: Result<T, ApiError>,
    expected_message: &str,
) -> ActionResult<ApiError> {
    match result {
        Ok(value) => Err(ActionError::Unexpected(format!(
            "{} was accepted, expected a rejection mentioning '{}': {:?}",
            what, expected_message, value
        ))),
        Err(e) if matches!(e.status(), Some(400..=599)) && e.mentions(expected_message) => {
            tracing::info!("{} blocked correctly: {}", what, expected_message);
            Ok(e)
        }
        Err(e) => Err(ActionError::Unexpected(format!(
            "{} failed, but not with '{}': {}",
            what, expected_message, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ServerErrorEntry;

    fn rejected(status: u16, message: &str) -> Result<(), ApiError> {
        Err(ApiError::Status {
            method: "POST".into(),
            url: "memory://ci/projects".into(),
            status,
            body: String::new(),
            errors: vec![ServerErrorEntry {
                message: Some(message.into()),
                additional_message: None,
            }],
        })
    }

    #[test]
    fn test_expect_rejection() {
        assert!(expect_rejection("Create project", rejected(400, "Project ID must not be empty"), "must not be empty").is_ok());
        assert!(matches!(
            expect_rejection("Create project", rejected(400, "other"), "must not be empty"),
            Err(ActionError::Unexpected(_))
        ));
        assert!(matches!(
            expect_rejection("Create project", Ok(()), "anything"),
            Err(ActionError::Unexpected(_))
        ));
        assert!(matches!(
            expect_rejection::<()>("Create project", Err(ApiError::Timeout(3)), "anything"),
            Err(ActionError::Unexpected(_))
        ));
    }
}
