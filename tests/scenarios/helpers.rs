//! Test utility functions for harness scenarios

use harness::api::fakes::ScriptedServer;
use harness::core::models::Build;
use harness::wait::{BuildWaitOptions, RetryPolicy, WaitError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Build wait budget used by most scenarios: 0.5 s polls, 10 s overall
pub fn half_second_polls() -> BuildWaitOptions {
    BuildWaitOptions::new()
        .with_timeout(Duration::from_secs(10))
        .with_poll_interval(Duration::from_millis(500))
}

/// Entity wait budget: `attempts` tries one second apart
pub fn attempts(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_secs(1))
}

/// A server whose build `build_id` reports `states` on successive polls
pub fn server_with_build_states(build_id: u64, build_type_id: &str, states: &[&str]) -> ScriptedServer {
    let server = ScriptedServer::new();
    server.script_build_states(build_id, build_type_id, states);
    server
}

/// Sequenced action for `retry`: yields `values` in order, then repeats the last
///
/// Clones share the call counter.
#[derive(Clone)]
pub struct Sequence<T> {
    values: Arc<Vec<T>>,
    index: Arc<AtomicUsize>,
}

impl<T: Clone> Sequence<T> {
    pub fn new(values: Vec<T>) -> Self {
        assert!(!values.is_empty(), "a sequence needs at least one value");
        Self {
            values: Arc::new(values),
            index: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn next(&self) -> T {
        let idx = self.index.fetch_add(1, Ordering::SeqCst);
        self.values[idx.min(self.values.len() - 1)].clone()
    }

    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }
}

/// Assert the wait ran out of attempts
pub fn assert_retry_exhausted(err: &WaitError, expected_attempts: u32) {
    match err {
        WaitError::RetryExhausted { max_attempts, .. } => {
            assert_eq!(*max_attempts, expected_attempts, "wrong attempt count in {err}")
        }
        other => panic!("expected RetryExhausted, got {other}"),
    }
}

/// Assert a build wait returned a finished build with the given id
pub fn assert_finished(build: &Build, expected_id: u64) {
    assert_eq!(build.id, expected_id, "wrong build returned");
    assert_eq!(build.state, "finished", "build {} not finished", build.id);
}
