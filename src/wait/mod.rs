//! Eventual-consistency waits
//!
//! The CI server does not promise that a create is visible to the next read,
//! nor that a triggered build is anywhere in particular by the time we ask
//! about it. Everything in here polls, strictly one request at a time, until
//! the server shows what the caller needs or the budget runs out.

pub mod build;
pub mod entity;
pub mod error;
pub mod retry;
pub mod traced;

pub use build::{
    get_latest_build_and_wait, latest_build_id, wait_for_build_completion, wait_for_build_state,
    BuildWaitOptions,
};
pub use entity::{
    wait_for_entity, wait_project_appears, wait_project_appears_with, wait_user_appears,
    wait_user_appears_with,
};
pub use error::WaitError;
pub use retry::{retry, RetryPolicy};
pub use traced::{traced, traced_with};
