//! Test: Actions layer end to end on the scripted server

use crate::helpers::*;
use harness::actions::{AdminActions, BuildActions};
use harness::api::fakes::{build, ScriptedServer};
use harness::api::ApiError;
use harness::core::generate;
use harness::core::models::{CreateProjectRequest, CreateUserRequest, Properties};
use harness::core::state::BuildLifecycleState;
use harness::core::{CreatedObject, RunContext};
use harness::ActionError;

/// create project -> wait -> build type -> trigger -> wait -> teardown
#[tokio::test(start_paused = true)]
async fn test_full_build_flow() {
    let server = ScriptedServer::new();
    let admin = AdminActions::new(&server).with_appearance_policy(attempts(3));
    let builds = BuildActions::new(&server).with_wait_options(half_second_polls());
    let mut ctx = RunContext::new();

    let request = CreateProjectRequest::new(generate::project_id(), generate::project_name()).unwrap();
    let project = admin.create_project_and_wait(&mut ctx, &request).await.unwrap();
    assert_eq!(project.id, request.id());

    let build_type = admin
        .create_build_type(&mut ctx, &project.id, &generate::build_type_name())
        .await
        .unwrap();
    let steps = admin.get_build_steps(&build_type.id).await.unwrap();
    assert_eq!(steps.len(), 1);

    let params = Properties::from_pairs([(generate::build_parameter_name(), generate::build_parameter_value())]);
    let queued = builds
        .trigger_build(&mut ctx, &build_type.id, Some(params))
        .await
        .unwrap();
    assert_eq!(queued.state, "queued");
    assert!(server.triggered()[0].properties().is_some());

    server.script_build_states(queued.id, &build_type.id, &["queued", "running", "finished"]);
    let finished = builds.wait_for_completion(queued.id).await.unwrap();
    assert_finished(&finished, queued.id);

    assert_eq!(ctx.len(), 3);
    let report = ctx.cleanup(&server).await;
    assert!(report.is_clean());
    assert_eq!(report.deleted, 3);
    assert_eq!(
        server.deleted(),
        vec![
            format!("build:{}", queued.id),
            format!("buildType:{}", build_type.id),
            format!("project:{}", project.id),
        ]
    );
}

/// Trigger, then find the build again knowing only its type
#[tokio::test(start_paused = true)]
async fn test_trigger_then_resolve_latest() {
    let server = ScriptedServer::new();
    let builds = BuildActions::new(&server).with_wait_options(half_second_polls());
    let mut ctx = RunContext::new();

    let first = builds.trigger_build(&mut ctx, "Proj_Build", None).await.unwrap();
    let second = builds.trigger_build(&mut ctx, "Proj_Build", None).await.unwrap();
    assert!(second.id > first.id);
    server.script_build_states(second.id, "Proj_Build", &["queued", "finished"]);

    let resolved = builds.get_latest_build_and_wait("Proj_Build").await.unwrap();

    assert_finished(&resolved, second.id);
    assert!(ctx.contains(&CreatedObject::Build(first.id)));
    assert!(ctx.contains(&CreatedObject::Build(second.id)));
}

/// Cancel a build caught while running
#[tokio::test(start_paused = true)]
async fn test_cancel_running_build() {
    let server = ScriptedServer::new();
    let builds = BuildActions::new(&server).with_wait_options(half_second_polls());
    let mut ctx = RunContext::new();

    let queued = builds.trigger_build(&mut ctx, "Proj_Build", None).await.unwrap();
    server.script_build_states(queued.id, "Proj_Build", &["queued", "running"]);

    let running = builds
        .wait_for_state(queued.id, &[BuildLifecycleState::Running])
        .await
        .unwrap();
    assert_eq!(running.state, "running");

    builds.cancel_running_build(running.id, "stop it").await.unwrap();
    let status = server.build_record(running.id).unwrap();
    assert_eq!(status.status.as_deref(), Some("UNKNOWN"));
    assert_eq!(status.status_text.as_deref(), Some("stop it"));
}

/// The user only shows up in the listing on the second read
#[tokio::test(start_paused = true)]
async fn test_create_user_and_wait_for_listing() {
    let server = ScriptedServer::new();
    let admin = AdminActions::new(&server).with_appearance_policy(attempts(4));
    let mut ctx = RunContext::new();
    let username = generate::username();
    let request = CreateUserRequest::new(username.clone(), generate::password()).unwrap();

    // the user is allocated id 1001 by the fake
    server.script_user_listings(vec![vec![], vec![harness::api::fakes::user(1001, &username)]]);
    let user = admin.create_user_and_wait(&mut ctx, &request).await.unwrap();

    assert_eq!(user.id, 1001);
    assert_eq!(server.calls("list_users"), 2);
    assert!(ctx.contains(&CreatedObject::User(1001)));
}

/// Appearance timeouts surface as not-ready
#[tokio::test(start_paused = true)]
async fn test_project_never_listed_is_not_ready() {
    let server = ScriptedServer::new();
    server.script_project_listings(vec![vec![]]);
    let admin = AdminActions::new(&server).with_appearance_policy(attempts(2));
    let mut ctx = RunContext::new();
    let request = CreateProjectRequest::new(generate::project_id(), generate::project_name()).unwrap();

    let err = admin.create_project_and_wait(&mut ctx, &request).await.unwrap_err();

    assert!(matches!(err, ActionError::Wait(_)));
    assert!(err.is_not_ready());
    // still registered, so teardown removes it
    assert_eq!(ctx.len(), 1);
}

/// Cancelling an unknown build is refused with an error entry
#[tokio::test(start_paused = true)]
async fn test_cancel_unknown_build_is_rejected() {
    let server = ScriptedServer::new().with_build(build(5, "Proj_Build", "finished"));
    let builds = BuildActions::new(&server);

    let err = builds
        .cancel_invalid_build(9999, "nope", "No queued build")
        .await
        .unwrap();

    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}
