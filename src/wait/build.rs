//! Waiting on build lifecycle transitions
//!
//! Builds move `queued -> running -> finished` (or straight from `queued`
//! to `finished` when cancelled early). The waiters here poll a single build
//! with a fields-limited fetch until it reaches the state the caller needs,
//! and the resolver finds the build a trigger just produced when only its
//! build type is known.
//!
//! Timeouts are measured as elapsed time since the wait started. At least one
//! poll is always made, even when the timeout is shorter than the interval.

use crate::api::endpoint::BUILD_POLL_FIELDS;
use crate::api::{CiServerApi, Endpoint};
use crate::core::config::WaitSettings;
use crate::core::models::Build;
use crate::core::state::{format_states, BuildLifecycleState};
use crate::wait::{traced, WaitError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Time budget for build waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildWaitOptions {
    /// Overall budget for the wait
    pub timeout: Duration,

    /// Pause between two polls
    pub poll_interval: Duration,
}

impl Default for BuildWaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl BuildWaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build-wait budget from the harness config
    pub fn from_settings(settings: &WaitSettings) -> Self {
        Self {
            timeout: settings.build_timeout(),
            poll_interval: settings.build_poll_interval(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Fetch the build's current state, traced as one poll attempt
async fn poll_build<A>(api: &A, build_id: u64, poll: u32, locator: &str) -> Result<Build, WaitError>
where
    A: CiServerApi + ?Sized,
{
    let title = format!("Poll {}: state of build {}", poll, build_id);
    let build = traced(&title, locator, api.get_build(build_id, Some(BUILD_POLL_FIELDS))).await?;
    debug!("Build {} is {}", build_id, build.state);
    Ok(build)
}

/// Wait until the build reaches `finished`
///
/// `queued` and `running` keep the wait going. Any other state fails the
/// wait on the first poll that reports it.
pub async fn wait_for_build_completion<A>(
    api: &A,
    build_id: u64,
    options: &BuildWaitOptions,
) -> Result<Build, WaitError>
where
    A: CiServerApi + ?Sized,
{
    let title = format!("Wait for build {} to finish", build_id);
    let locator = api.resource_locator(&Endpoint::Builds.by_id(build_id));
    let start = Instant::now();
    let mut poll = 0;

    loop {
        poll += 1;
        let build = poll_build(api, build_id, poll, &locator).await?;

        match build.lifecycle_state() {
            Ok(BuildLifecycleState::Finished) => {
                info!(
                    "Build {} finished after {} poll(s) with status {}",
                    build_id,
                    poll,
                    build.status.as_deref().unwrap_or("UNKNOWN")
                );
                return Ok(build);
            }
            Ok(_) => {}
            Err(unknown) => {
                return Err(WaitError::UnexpectedBuildState {
                    title,
                    build_id,
                    state: unknown.0,
                });
            }
        }

        sleep(options.poll_interval).await;
        if start.elapsed() >= options.timeout {
            return Err(WaitError::BuildWaitTimeout {
                title,
                build_id,
                timeout: options.timeout,
            });
        }
    }
}

/// Wait until the build is in one of `expected`
///
/// Used to catch a build mid-`running`. States outside `expected`, including
/// ones that do not parse, just keep the wait going.
pub async fn wait_for_build_state<A>(
    api: &A,
    build_id: u64,
    expected: &[BuildLifecycleState],
    options: &BuildWaitOptions,
) -> Result<Build, WaitError>
where
    A: CiServerApi + ?Sized,
{
    let title = format!("Wait for build {} to be {}", build_id, format_states(expected));
    let locator = api.resource_locator(&Endpoint::Builds.by_id(build_id));
    let start = Instant::now();
    let mut poll = 0;

    loop {
        poll += 1;
        let build = poll_build(api, build_id, poll, &locator).await?;

        if let Ok(state) = build.lifecycle_state() {
            if expected.contains(&state) {
                info!("Build {} reached {} after {} poll(s)", build_id, state, poll);
                return Ok(build);
            }
        }

        sleep(options.poll_interval).await;
        if start.elapsed() >= options.timeout {
            return Err(WaitError::BuildStateTimeout {
                title,
                build_id,
                expected: expected.to_vec(),
                timeout: options.timeout,
            });
        }
    }
}

/// Largest build id of `build_type_id` in a listing
pub fn latest_build_id(builds: &[Build], build_type_id: &str) -> Option<u64> {
    builds
        .iter()
        .filter(|b| b.build_type_id == build_type_id)
        .map(|b| b.id)
        .max()
}

/// Find the most recent build of a build type and wait for it to finish
///
/// The queue is checked first; a fast build may already have left it, so
/// the recent-builds listing is the fallback. The build found is handed to
/// `wait_for_build_completion` with whatever remains of `options.timeout`.
pub async fn get_latest_build_and_wait<A>(
    api: &A,
    build_type_id: &str,
    options: &BuildWaitOptions,
) -> Result<Build, WaitError>
where
    A: CiServerApi + ?Sized,
{
    let queue_locator = api.resource_locator(Endpoint::BuildQueue.path());
    let builds_locator = api.resource_locator(Endpoint::Builds.path());
    let start = Instant::now();
    let mut round = 0;

    loop {
        round += 1;

        let queued = traced(
            &format!("Round {}: queued builds of {}", round, build_type_id),
            &queue_locator,
            api.list_queue(),
        )
        .await?;

        let found = match latest_build_id(&queued, build_type_id) {
            Some(id) => {
                debug!("Build {} of {} found in queue", id, build_type_id);
                Some(id)
            }
            None => {
                let recent = traced(
                    &format!("Round {}: recent builds of {}", round, build_type_id),
                    &builds_locator,
                    api.list_builds(build_type_id),
                )
                .await?;
                let id = latest_build_id(&recent, build_type_id);
                if let Some(id) = id {
                    debug!("Build {} of {} found in history", id, build_type_id);
                }
                id
            }
        };

        if let Some(build_id) = found {
            let remaining = options.timeout.saturating_sub(start.elapsed());
            info!(
                "Waiting for build {} of {} ({:.1}s left)",
                build_id,
                build_type_id,
                remaining.as_secs_f64()
            );
            let handoff = options.with_timeout(remaining);
            return wait_for_build_completion(api, build_id, &handoff).await;
        }

        sleep(options.poll_interval).await;
        if start.elapsed() >= options.timeout {
            return Err(WaitError::NoBuildFound {
                title: format!("Find the latest build of {}", build_type_id),
                build_type_id: build_type_id.to_string(),
                timeout: options.timeout,
            });
        }
    }
}
