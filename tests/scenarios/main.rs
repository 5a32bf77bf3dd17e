//! Scenario-based tests for the harness waiters and actions

mod helpers;

mod actions;
mod build_waiter;
mod cleanup;
mod entity_waiter;
mod resolver;
mod retry_behavior;
