//! Core domain models for the harness
//!
//! This module defines the typed REST records, the build lifecycle, the
//! per-run context of created objects, configuration and test data.

pub mod config;
pub mod context;
pub mod generate;
pub mod models;
pub mod state;

pub use config::HarnessConfig;
pub use context::{CleanupReport, CreatedObject, RunContext};
pub use state::BuildLifecycleState;
