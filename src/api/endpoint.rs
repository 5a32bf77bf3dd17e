//! REST endpoint paths and locator helpers

use std::collections::BTreeSet;

/// Fields the build-state waiter asks for on every poll
pub const BUILD_POLL_FIELDS: &str = "id,buildTypeId,state,status";

/// Fields every build fetch must include for the record to decode
pub const BUILD_REQUIRED_FIELDS: [&str; 3] = ["id", "buildTypeId", "state"];

/// Collection endpoints, relative to the REST base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Projects,
    Users,
    Builds,
    BuildQueue,
    BuildTypes,
    Agents,
}

impl Endpoint {
    /// Path of the collection
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Projects => "/projects",
            Endpoint::Users => "/users",
            Endpoint::Builds => "/builds",
            Endpoint::BuildQueue => "/buildQueue",
            Endpoint::BuildTypes => "/buildTypes",
            Endpoint::Agents => "/agents",
        }
    }

    /// Path of a single entity addressed by an `id:` locator
    pub fn by_id(&self, id: impl std::fmt::Display) -> String {
        format!("{}/id:{}", self.path(), id)
    }
}

/// Path of the steps collection of a build type
pub fn build_steps_path(build_type_id: &str) -> String {
    format!("{}/steps", Endpoint::BuildTypes.by_id(build_type_id))
}

/// Path of a single build step
pub fn build_step_path(build_type_id: &str, step_id: &str) -> String {
    format!("{}/{}", build_steps_path(build_type_id), step_id)
}

/// Path of an agent boolean setting (`enabled` / `authorized`)
pub fn agent_flag_path(agent_id: u64, flag: &str) -> String {
    format!("{}/{}", Endpoint::Agents.by_id(agent_id), flag)
}

/// Locator selecting every build of a build type, whatever its state
pub fn builds_of_type_locator(build_type_id: &str) -> String {
    format!("buildType:id:{},state:any", build_type_id)
}

/// Merge a caller's `fields` selection with the fields a record needs
///
/// `None` (or an empty selection) means "full object" and stays `None`.
/// Otherwise the result is the sorted union, comma-joined.
pub fn merge_required_fields(fields: Option<&str>, required: &[&str]) -> Option<String> {
    let fields = fields?;
    let requested: BTreeSet<&str> = fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if requested.is_empty() {
        return None;
    }
    let merged: BTreeSet<&str> = requested.into_iter().chain(required.iter().copied()).collect();
    Some(merged.into_iter().collect::<Vec<_>>().join(","))
}
