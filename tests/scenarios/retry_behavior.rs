//! Test: Retry Primitive

use crate::helpers::*;
use harness::api::ApiError;
use harness::wait::{retry, RetryPolicy, WaitError};
use std::time::Duration;
use tokio::time::Instant;

/// Condition never holds: exactly N calls for several N
#[tokio::test(start_paused = true)]
async fn test_exhaustion_makes_exactly_n_calls() {
    for n in 1..=6u32 {
        let seq = Sequence::new(vec![false]);
        let action_seq = seq.clone();

        let err = retry(
            "never ready",
            "memory://ci/thing",
            move || {
                let value = action_seq.next();
                async move { Ok::<_, ApiError>(value) }
            },
            |ready| *ready,
            RetryPolicy::new(n, Duration::from_millis(250)),
        )
        .await
        .unwrap_err();

        assert_retry_exhausted(&err, n);
        assert_eq!(seq.calls(), n as usize);
    }
}

/// Condition holds on attempt k: k calls, k-1 sleeps
#[tokio::test(start_paused = true)]
async fn test_success_on_attempt_k() {
    for k in 1..=5usize {
        let mut values = vec![false; k - 1];
        values.push(true);
        let seq = Sequence::new(values);
        let action_seq = seq.clone();
        let start = Instant::now();

        let ready = retry(
            "becomes ready",
            "memory://ci/thing",
            move || {
                let value = action_seq.next();
                async move { Ok::<_, ApiError>(value) }
            },
            |ready| *ready,
            RetryPolicy::new(5, Duration::from_secs(1)),
        )
        .await
        .unwrap();

        assert!(ready);
        assert_eq!(seq.calls(), k);
        assert_eq!(start.elapsed(), Duration::from_secs(k as u64 - 1));
    }
}

/// An action error ends the wait on the spot
#[tokio::test(start_paused = true)]
async fn test_error_is_not_retried() {
    let seq = Sequence::new(vec![Err("503"), Ok(true)]);
    let action_seq = seq.clone();

    let err = retry(
        "flaky server",
        "memory://ci/thing",
        move || {
            let value = action_seq.next();
            async move {
                value.map_err(|status| ApiError::Transport {
                    url: "memory://ci/thing".into(),
                    message: status.into(),
                })
            }
        },
        |ready| *ready,
        RetryPolicy::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, WaitError::Api(ApiError::Transport { .. })));
    assert!(err.is_not_ready());
    assert_eq!(seq.calls(), 1);
}
