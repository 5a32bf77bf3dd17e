//! Waiting for a just-created entity to show up in a listing

use crate::api::{ApiResult, CiServerApi, Endpoint};
use crate::core::models::{Project, User};
use crate::wait::{retry, RetryPolicy, WaitError};
use std::future::Future;
use tracing::info;

/// Poll `list_fn` until an entity whose id equals `target_id` is listed
///
/// The entity is returned from the same listing that satisfied the check.
pub async fn wait_for_entity<E, L, Fut, X>(
    title: &str,
    target_id: &str,
    locator: &str,
    list_fn: L,
    extract_id: X,
    policy: RetryPolicy,
) -> Result<E, WaitError>
where
    L: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<Vec<E>>>,
    X: Fn(&E) -> String,
{
    let listing = retry(
        title,
        locator,
        list_fn,
        |entities: &Vec<E>| entities.iter().any(|e| extract_id(e) == target_id),
        policy,
    )
    .await?;

    listing
        .into_iter()
        .find(|e| extract_id(e) == target_id)
        .ok_or_else(|| WaitError::EntityNotFound {
            title: title.to_string(),
            target: target_id.to_string(),
        })
}

/// Wait for a project to appear in `GET /projects` with the default budget
pub async fn wait_project_appears<A>(api: &A, project_id: &str) -> Result<Project, WaitError>
where
    A: CiServerApi + ?Sized,
{
    wait_project_appears_with(api, project_id, RetryPolicy::default()).await
}

pub async fn wait_project_appears_with<A>(
    api: &A,
    project_id: &str,
    policy: RetryPolicy,
) -> Result<Project, WaitError>
where
    A: CiServerApi + ?Sized,
{
    let title = format!("Wait for project '{}' to appear", project_id);
    let locator = api.resource_locator(Endpoint::Projects.path());
    let project = wait_for_entity(
        &title,
        project_id,
        &locator,
        || api.list_projects(),
        |p: &Project| p.id.clone(),
        policy,
    )
    .await?;
    info!("Project {} is visible", project.entity_ref());
    Ok(project)
}

/// Wait for a user to appear in `GET /users` with the default budget
///
/// Usernames are compared case-insensitively; the server stores them lower-cased.
pub async fn wait_user_appears<A>(api: &A, username: &str) -> Result<User, WaitError>
where
    A: CiServerApi + ?Sized,
{
    wait_user_appears_with(api, username, RetryPolicy::default()).await
}

pub async fn wait_user_appears_with<A>(
    api: &A,
    username: &str,
    policy: RetryPolicy,
) -> Result<User, WaitError>
where
    A: CiServerApi + ?Sized,
{
    let title = format!("Wait for user '{}' to appear", username);
    let locator = api.resource_locator(Endpoint::Users.path());
    let target = username.to_lowercase();
    let user = wait_for_entity(
        &title,
        &target,
        &locator,
        || api.list_users(),
        |u: &User| u.username.to_lowercase(),
        policy,
    )
    .await?;
    info!("User {} (id {}) is visible", user.username, user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fakes::{project, user, ScriptedServer};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_project_appears_on_third_listing() {
        let server = ScriptedServer::new();
        server.script_project_listings(vec![
            vec![],
            vec![],
            vec![project("other", "Other"), project("proj1", "Project One")],
        ]);

        let found = wait_project_appears_with(
            &server,
            "proj1",
            RetryPolicy::new(5, Duration::from_secs(1)),
        )
        .await
        .unwrap();

        assert_eq!(found.id, "proj1");
        assert_eq!(found.name, "Project One");
        assert_eq!(server.calls("list_projects"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_project_never_appears() {
        let server = ScriptedServer::new();
        let start = Instant::now();

        let err = wait_project_appears(&server, "ghost").await.unwrap_err();

        match err {
            WaitError::RetryExhausted { title, max_attempts } => {
                assert!(title.contains("ghost"));
                assert_eq!(max_attempts, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(server.calls("list_projects"), 10);
        assert_eq!(start.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_match_ignores_case() {
        let server = ScriptedServer::new().with_user(user(12, "alice_qa"));

        let found = wait_user_appears(&server, "Alice_QA").await.unwrap();

        assert_eq!(found.id, 12);
        assert_eq!(server.calls("list_users"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entity_missing_from_satisfying_listing() {
        // an id extractor that disagrees with itself between check and re-scan
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result = wait_for_entity(
            "flaky extractor",
            "x",
            "memory://list",
            || async { Ok(vec![1u32]) },
            |_| {
                if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                    "x".to_string()
                } else {
                    "y".to_string()
                }
            },
            RetryPolicy::new(1, Duration::ZERO),
        )
        .await;

        assert!(matches!(
            result,
            Err(WaitError::EntityNotFound { ref target, .. }) if target == "x"
        ));
    }
}
