//! Test: Entity-Appearance Waiter

use crate::helpers::*;
use harness::api::fakes::{project, user, ScriptedServer};
use harness::api::ApiError;
use harness::wait::{wait_project_appears_with, wait_user_appears, WaitError};
use std::time::Duration;
use tokio::time::Instant;

/// Empty, empty, then proj1: three listings
#[tokio::test(start_paused = true)]
async fn test_project_visible_on_third_listing() {
    let server = ScriptedServer::new();
    server.script_project_listings(vec![vec![], vec![], vec![project("proj1", "Project One")]]);
    let start = Instant::now();

    let found = wait_project_appears_with(&server, "proj1", attempts(5)).await.unwrap();

    assert_eq!(found.id, "proj1");
    assert_eq!(server.calls("list_projects"), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

/// Never visible: exactly N listings, then RetryExhausted naming the project
#[tokio::test(start_paused = true)]
async fn test_project_never_visible() {
    let server = ScriptedServer::new().with_project(project("other", "Other"));

    let err = wait_project_appears_with(&server, "proj1", attempts(5)).await.unwrap_err();

    assert_retry_exhausted(&err, 5);
    assert!(err.to_string().contains("proj1"));
    assert!(err.is_not_ready());
    assert_eq!(server.calls("list_projects"), 5);
}

/// A failing listing is not retried
#[tokio::test(start_paused = true)]
async fn test_listing_error_propagates() {
    let server = ScriptedServer::new();
    server.fail_next("list_projects", ApiError::Internal("decode failure".into()));

    let err = wait_project_appears_with(&server, "proj1", attempts(5)).await.unwrap_err();

    assert!(matches!(err, WaitError::Api(ApiError::Internal(_))));
    assert_eq!(server.calls("list_projects"), 1);
}

/// The matching entity comes from the listing, not a second request
#[tokio::test(start_paused = true)]
async fn test_user_returned_from_same_listing() {
    let server = ScriptedServer::new();
    server.script_user_listings(vec![vec![], vec![user(1, "admin"), user(27, "qa_bot")]]);

    let found = wait_user_appears(&server, "QA_Bot").await.unwrap();

    assert_eq!(found.id, 27);
    assert_eq!(server.calls("list_users"), 2);
}
