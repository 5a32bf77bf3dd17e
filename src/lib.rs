//! harness - REST harness for a TeamCity-style CI server
//!
//! Creates and removes server-side objects over REST and waits for the
//! server to catch up: entity appearance after creation and build lifecycle
//! transitions after triggering.

pub mod actions;
pub mod api;
pub mod cli;
pub mod core;
pub mod wait;

// Re-export commonly used types
pub use actions::{ActionError, AdminActions, AgentActions, BuildActions};
pub use api::{ApiClientConfig, ApiError, CiServerApi, RestClient};
pub use crate::core::{BuildLifecycleState, CreatedObject, HarnessConfig, RunContext};
pub use wait::{BuildWaitOptions, RetryPolicy, WaitError};
