//! Bounded-attempt polling with a fixed delay

use crate::api::ApiResult;
use crate::core::config::WaitSettings;
use crate::wait::{traced_with, WaitError};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Attempt budget for `retry`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (0 is treated as 1)
    pub max_attempts: u32,

    /// Pause between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Entity-appearance budget from the harness config
    pub fn from_settings(settings: &WaitSettings) -> Self {
        Self::new(settings.entity_attempts, settings.entity_delay())
    }

    /// Attempts that will actually be made
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Invoke `action` until `condition` holds on its result
///
/// Attempts run one after another; every attempt is traced as
/// `Attempt {n}: {title}` before the action starts. A value satisfying
/// `condition` is returned at once. An error from `action` is returned at
/// once as well, it is not retried. The delay is only slept between
/// attempts, never after the last one.
pub async fn retry<T, A, Fut, C>(
    title: &str,
    locator: &str,
    mut action: A,
    condition: C,
    policy: RetryPolicy,
) -> Result<T, WaitError>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
    C: Fn(&T) -> bool,
{
    let max_attempts = policy.effective_attempts();

    for attempt in 1..=max_attempts {
        let step = format!("Attempt {}: {}", attempt, title);
        let value = traced_with(&step, locator, || action()).await?;

        if condition(&value) {
            debug!("{} succeeded on attempt {}", title, attempt);
            return Ok(value);
        }

        if attempt < max_attempts {
            sleep(policy.delay).await;
        }
    }

    warn!("{}: giving up after {} attempts", title, max_attempts);
    Err(WaitError::RetryExhausted {
        title: title.to_string(),
        max_attempts,
    })
}
