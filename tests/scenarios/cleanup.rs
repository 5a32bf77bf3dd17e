//! Test: Run context teardown

use harness::api::fakes::{build, project, user, ScriptedServer};
use harness::api::ApiError;
use harness::core::{CreatedObject, RunContext};

/// Dependents go before what they depend on, whatever the registration order
#[tokio::test]
async fn test_teardown_order() {
    let server = ScriptedServer::new()
        .with_project(project("P1", "One"))
        .with_user(user(7, "qa"))
        .with_build(build(11, "P1_Build", "finished"));
    let mut ctx = RunContext::new();
    ctx.register(CreatedObject::Project("P1".into()));
    ctx.register(CreatedObject::User(7));
    ctx.register(CreatedObject::Build(11));

    let report = ctx.cleanup(&server).await;

    assert_eq!(report.deleted, 3);
    assert_eq!(server.deleted(), vec!["build:11", "user:7", "project:P1"]);
    assert!(ctx.is_empty());
}

/// Objects deleted by the test itself count as already gone
#[tokio::test]
async fn test_missing_objects_are_not_failures() {
    let server = ScriptedServer::new().with_project(project("P1", "One"));
    let mut ctx = RunContext::new();
    ctx.register(CreatedObject::Build(404));
    ctx.register(CreatedObject::Project("P1".into()));

    let report = ctx.cleanup(&server).await;

    assert!(report.is_clean());
    assert_eq!(report.deleted, 1);
    assert_eq!(report.already_gone, 1);
}

/// One failed delete does not stop the rest of the teardown
#[tokio::test]
async fn test_failure_does_not_abort_teardown() {
    let server = ScriptedServer::new()
        .with_project(project("P1", "One"))
        .with_user(user(7, "qa"));
    server.fail_next(
        "delete_user",
        ApiError::Transport {
            url: "memory://ci/users/id:7".into(),
            message: "connection reset".into(),
        },
    );
    let mut ctx = RunContext::new();
    ctx.register(CreatedObject::User(7));
    ctx.register(CreatedObject::Project("P1".into()));

    let report = ctx.cleanup(&server).await;

    assert!(!report.is_clean());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, CreatedObject::User(7));
    assert!(report.failed[0].1.contains("connection reset"));
    assert_eq!(server.deleted(), vec!["project:P1"]);
    assert!(ctx.is_empty());
}

/// A second cleanup has nothing left to do
#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let server = ScriptedServer::new().with_build(build(11, "Bt", "finished"));
    let mut ctx = RunContext::new();
    ctx.register(CreatedObject::Build(11));
    ctx.register(CreatedObject::Build(11));

    let first = ctx.cleanup(&server).await;
    let second = ctx.cleanup(&server).await;

    assert_eq!(first.deleted, 1);
    assert_eq!(second.deleted + second.already_gone, 0);
    assert_eq!(server.calls("delete_build"), 1);
}
