//! Test: Build State Waiter

use crate::helpers::*;
use harness::core::state::BuildLifecycleState;
use harness::wait::{wait_for_build_completion, wait_for_build_state, BuildWaitOptions, WaitError};
use std::time::Duration;
use tokio::time::Instant;

/// queued, queued, running, finished: four polls and three half-second sleeps
#[tokio::test(start_paused = true)]
async fn test_build_progresses_to_finished() {
    let server = server_with_build_states(101, "Proj_Build", &["queued", "queued", "running", "finished"]);
    let start = Instant::now();

    let build = wait_for_build_completion(&server, 101, &half_second_polls())
        .await
        .unwrap();

    assert_finished(&build, 101);
    assert_eq!(server.calls("get_build"), 4);
    assert_eq!(start.elapsed(), Duration::from_millis(1500));
}

/// queued, then an unknown state: fail on the second poll, not at the timeout
#[tokio::test(start_paused = true)]
async fn test_unknown_state_fails_fast() {
    let server = server_with_build_states(102, "Proj_Build", &["queued", "error"]);
    let start = Instant::now();

    let err = wait_for_build_completion(&server, 102, &half_second_polls())
        .await
        .unwrap_err();

    match err {
        WaitError::UnexpectedBuildState { build_id, ref state, .. } => {
            assert_eq!(build_id, 102);
            assert_eq!(state, "error");
        }
        ref other => panic!("expected UnexpectedBuildState, got {other}"),
    }
    assert!(err
        .to_string()
        .starts_with("Wait for build 102 to finish: build 102"));
    assert_eq!(server.calls("get_build"), 2);
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

/// A finished build returns on the first poll whatever the budget
#[tokio::test(start_paused = true)]
async fn test_finished_build_returns_immediately() {
    for timeout in [Duration::ZERO, Duration::from_secs(1), Duration::from_secs(300)] {
        let server = server_with_build_states(103, "Proj_Build", &["finished"]);
        let options = BuildWaitOptions::new().with_timeout(timeout);

        let build = wait_for_build_completion(&server, 103, &options).await.unwrap();

        assert_finished(&build, 103);
        assert_eq!(server.calls("get_build"), 1);
    }
}

/// Timeout below the poll interval still gets exactly one poll
#[tokio::test(start_paused = true)]
async fn test_tiny_timeout_polls_once() {
    let server = server_with_build_states(104, "Proj_Build", &["queued"]);
    let options = BuildWaitOptions::new()
        .with_timeout(Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(500));

    let err = wait_for_build_completion(&server, 104, &options).await.unwrap_err();

    assert!(matches!(err, WaitError::BuildWaitTimeout { build_id: 104, .. }));
    assert!(err.is_timeout());
    assert_eq!(server.calls("get_build"), 1);
}

/// Default budget: 300 s at 0.5 s is 600 polls
#[tokio::test(start_paused = true)]
async fn test_default_budget_for_stuck_build() {
    let server = server_with_build_states(105, "Proj_Build", &["running"]);
    let start = Instant::now();

    let err = wait_for_build_completion(&server, 105, &BuildWaitOptions::default())
        .await
        .unwrap_err();

    match err {
        WaitError::BuildWaitTimeout { build_id, timeout, .. } => {
            assert_eq!(build_id, 105);
            assert_eq!(timeout, Duration::from_secs(300));
        }
        other => panic!("expected BuildWaitTimeout, got {other}"),
    }
    assert_eq!(server.calls("get_build"), 600);
    assert_eq!(start.elapsed(), Duration::from_secs(300));
}

/// Catch a build while it is running
#[tokio::test(start_paused = true)]
async fn test_wait_for_running_state() {
    let server = server_with_build_states(106, "Proj_Build", &["queued", "queued", "running", "finished"]);

    let build = wait_for_build_state(&server, 106, &[BuildLifecycleState::Running], &half_second_polls())
        .await
        .unwrap();

    assert_eq!(build.state, "running");
    assert_eq!(server.calls("get_build"), 3);
}

/// A build that skipped the target state never satisfies the wait
#[tokio::test(start_paused = true)]
async fn test_missed_target_state_times_out() {
    let server = server_with_build_states(107, "Proj_Build", &["finished"]);
    let options = half_second_polls().with_timeout(Duration::from_secs(1));

    let err = wait_for_build_state(&server, 107, &[BuildLifecycleState::Running], &options)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("running"));
    assert!(matches!(err, WaitError::BuildStateTimeout { build_id: 107, .. }));
}
