//! Run context - objects created during a run and their teardown

use crate::api::CiServerApi;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{error, info};

/// A server-side object the run created and must remove again
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CreatedObject {
    Project(String),
    User(u64),
    Build(u64),
    BuildType(String),
}

impl CreatedObject {
    /// Teardown order: builds, then build types, users, projects last
    fn teardown_rank(&self) -> u8 {
        match self {
            CreatedObject::Build(_) => 0,
            CreatedObject::BuildType(_) => 1,
            CreatedObject::User(_) => 2,
            CreatedObject::Project(_) => 3,
        }
    }

    async fn delete<A>(&self, api: &A) -> crate::api::ApiResult<()>
    where
        A: CiServerApi + ?Sized,
    {
        match self {
            CreatedObject::Project(id) => api.delete_project(id).await,
            CreatedObject::User(id) => api.delete_user(*id).await,
            CreatedObject::Build(id) => api.delete_build(*id).await,
            CreatedObject::BuildType(id) => api.delete_build_type(id).await,
        }
    }
}

impl fmt::Display for CreatedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatedObject::Project(id) => write!(f, "project {}", id),
            CreatedObject::User(id) => write!(f, "user {}", id),
            CreatedObject::Build(id) => write!(f, "build {}", id),
            CreatedObject::BuildType(id) => write!(f, "build type {}", id),
        }
    }
}

/// A created object and when it was registered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEntry {
    pub object: CreatedObject,
    pub created_at: DateTime<Utc>,
}

/// Outcome of `RunContext::cleanup`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Objects deleted
    pub deleted: usize,

    /// Objects the server no longer knew about
    pub already_gone: usize,

    /// Objects that could not be deleted, with the reason
    pub failed: Vec<(CreatedObject, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-run record of created objects
///
/// Passed explicitly to whatever creates objects, so two runs never share
/// a registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunContext {
    entries: Vec<CreatedEntry>,
}

impl RunContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an object for teardown
    pub fn register(&mut self, object: CreatedObject) {
        self.entries.push(CreatedEntry {
            object,
            created_at: Utc::now(),
        });
    }

    /// Stop tracking an object the caller already removed
    pub fn forget(&mut self, object: &CreatedObject) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.object != object);
        self.entries.len() != before
    }

    pub fn contains(&self, object: &CreatedObject) -> bool {
        self.entries.iter().any(|e| &e.object == object)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CreatedEntry] {
        &self.entries
    }

    /// Unique objects in teardown order
    ///
    /// Within one kind, newer objects go first.
    pub fn teardown_plan(&self) -> Vec<CreatedObject> {
        let mut seen = HashSet::new();
        let mut plan: Vec<&CreatedEntry> = self
            .entries
            .iter()
            .filter(|e| seen.insert(e.object.clone()))
            .collect();
        plan.sort_by(|a, b| {
            a.object
                .teardown_rank()
                .cmp(&b.object.teardown_rank())
                .then(b.created_at.cmp(&a.created_at))
        });
        plan.into_iter().map(|e| e.object.clone()).collect()
    }

    /// Delete every registered object and empty the context
    ///
    /// A failed delete is logged and reported; it never stops the teardown.
    pub async fn cleanup<A>(&mut self, api: &A) -> CleanupReport
    where
        A: CiServerApi + ?Sized,
    {
        let plan = self.teardown_plan();
        self.entries.clear();

        let mut report = CleanupReport::default();
        if plan.is_empty() {
            info!("No objects to clean up");
            return report;
        }

        info!("Cleaning up {} object(s)", plan.len());
        for object in plan {
            match object.delete(api).await {
                Ok(()) => {
                    info!("Cleaned up {}", object);
                    report.deleted += 1;
                }
                Err(e) if e.is_not_found() => {
                    info!("{} was already gone", object);
                    report.already_gone += 1;
                }
                Err(e) => {
                    error!("Failed to clean up {}: {}", object, e);
                    report.failed.push((object, e.to_string()));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fakes::{build, project, user, ScriptedServer};
    use crate::api::ApiError;

    #[test]
    fn test_register_and_forget() {
        let mut ctx = RunContext::new();
        ctx.register(CreatedObject::Build(5));
        ctx.register(CreatedObject::Project("P".into()));
        assert_eq!(ctx.len(), 2);
        assert!(ctx.forget(&CreatedObject::Build(5)));
        assert!(!ctx.forget(&CreatedObject::Build(5)));
        assert!(!ctx.contains(&CreatedObject::Build(5)));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_teardown_plan_orders_and_dedupes() {
        let mut ctx = RunContext::new();
        ctx.register(CreatedObject::Project("P".into()));
        ctx.register(CreatedObject::User(7));
        ctx.register(CreatedObject::BuildType("P_Bt".into()));
        ctx.register(CreatedObject::Build(11));
        ctx.register(CreatedObject::Build(11));

        assert_eq!(
            ctx.teardown_plan(),
            vec![
                CreatedObject::Build(11),
                CreatedObject::BuildType("P_Bt".into()),
                CreatedObject::User(7),
                CreatedObject::Project("P".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cleanup_continues_past_failures() {
        let server = ScriptedServer::new()
            .with_project(project("P", "Project"))
            .with_user(user(7, "bob"))
            .with_build(build(11, "P_Bt", "finished"));
        server.fail_next("delete_user", ApiError::Internal("locked".into()));

        let mut ctx = RunContext::new();
        ctx.register(CreatedObject::Project("P".into()));
        ctx.register(CreatedObject::User(7));
        ctx.register(CreatedObject::Build(11));
        ctx.register(CreatedObject::Project("Gone".into()));

        let report = ctx.cleanup(&server).await;

        assert_eq!(report.deleted, 2);
        assert_eq!(report.already_gone, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, CreatedObject::User(7));
        assert!(!report.is_clean());
        assert!(ctx.is_empty());
        assert_eq!(server.deleted(), vec!["build:11", "project:P"]);
    }

    #[test]
    fn test_created_object_serialization() {
        let json = serde_json::to_value(CreatedObject::Build(3)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "build", "id": 3}));
    }
}
