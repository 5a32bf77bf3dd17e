//! Test: Queue/Recent-Build Resolver

use crate::helpers::*;
use harness::api::fakes::{build, ScriptedServer};
use harness::wait::{get_latest_build_and_wait, WaitError};
use std::time::Duration;
use tokio::time::Instant;

/// Queue has nothing for the type, history has 42: wait on 42
#[tokio::test(start_paused = true)]
async fn test_falls_back_to_recent_builds() {
    let server = ScriptedServer::new();
    server.script_queue(vec![vec![build(77, "Other_Build", "queued")]]);
    server.script_recent_builds(vec![vec![build(42, "Proj_Build", "finished"), build(40, "Proj_Build", "finished")]]);
    server.script_build_states(42, "Proj_Build", &["finished"]);

    let build = get_latest_build_and_wait(&server, "Proj_Build", &half_second_polls())
        .await
        .unwrap();

    assert_finished(&build, 42);
    assert_eq!(server.calls("list_queue"), 1);
    assert_eq!(server.calls("list_builds"), 1);
}

/// The hand-off only gets what is left of the budget
#[tokio::test(start_paused = true)]
async fn test_hand_off_uses_remaining_budget() {
    let server = ScriptedServer::new();
    server.script_queue(vec![vec![]]);
    server.script_recent_builds(vec![vec![], vec![], vec![build(42, "Proj_Build", "running")]]);
    server.script_build_states(42, "Proj_Build", &["running"]);
    let start = Instant::now();

    let err = get_latest_build_and_wait(&server, "Proj_Build", &half_second_polls())
        .await
        .unwrap_err();

    match err {
        WaitError::BuildWaitTimeout { build_id, timeout, .. } => {
            assert_eq!(build_id, 42);
            assert_eq!(timeout, Duration::from_secs(9));
        }
        other => panic!("expected BuildWaitTimeout, got {other}"),
    }
    // resolver and hand-off together stay within the 10 s budget
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

/// The newest queued build wins and history is not consulted
#[tokio::test(start_paused = true)]
async fn test_queue_takes_precedence() {
    let server = ScriptedServer::new();
    server.script_queue(vec![vec![
        build(50, "Proj_Build", "queued"),
        build(52, "Proj_Build", "queued"),
        build(51, "Proj_Build", "queued"),
    ]]);
    server.script_build_states(52, "Proj_Build", &["queued", "running", "finished"]);

    let build = get_latest_build_and_wait(&server, "Proj_Build", &half_second_polls())
        .await
        .unwrap();

    assert_finished(&build, 52);
    assert_eq!(server.calls("list_builds"), 0);
}

/// No build anywhere: NoBuildFound with the build type
#[tokio::test(start_paused = true)]
async fn test_no_build_found() {
    let server = ScriptedServer::new();
    let options = half_second_polls().with_timeout(Duration::from_secs(3));

    let err = get_latest_build_and_wait(&server, "Proj_Build", &options)
        .await
        .unwrap_err();

    match &err {
        WaitError::NoBuildFound { build_type_id, timeout, .. } => {
            assert_eq!(build_type_id, "Proj_Build");
            assert_eq!(*timeout, Duration::from_secs(3));
        }
        other => panic!("expected NoBuildFound, got {other}"),
    }
    assert!(err
        .to_string()
        .starts_with("Find the latest build of Proj_Build: no build of type 'Proj_Build'"));
    assert_eq!(server.calls("list_queue"), 6);
    assert_eq!(server.calls("list_builds"), 6);
}
