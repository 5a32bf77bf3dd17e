//! Step logging around a single awaited operation

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, info_span, warn, Instrument};

/// Run `action` inside a tracing span named after `title`
///
/// On failure a warning with `locator` (the resource the step was aimed at)
/// is emitted and the error is handed back untouched.
pub async fn traced<T, E, F>(title: &str, locator: &str, action: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    traced_with(title, locator, || action).await
}

/// Like `traced`, but the action is only started once the step is logged
///
/// `start` runs inside the span, so any work it does before handing back
/// its future is attributed to the step.
pub async fn traced_with<T, E, S, F>(title: &str, locator: &str, start: S) -> Result<T, E>
where
    S: FnOnce() -> F,
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let span = info_span!("step", title = %title, locator = %locator);
    let action = span.in_scope(|| {
        debug!("{}", title);
        start()
    });
    let result = action.instrument(span.clone()).await;
    if let Err(e) = &result {
        span.in_scope(|| warn!("{} failed at {}: {}", title, locator, e));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_traced_passes_value_through() {
        let result: Result<u32, String> = traced("Compute", "memory://x", async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_traced_passes_error_through_unchanged() {
        let result: Result<u32, String> =
            traced("Compute", "memory://x", async { Err("boom".to_string()) }).await;
        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_traced_with_starts_action_inside_step() {
        let order = std::sync::Mutex::new(Vec::new());
        let result: Result<(), String> = traced_with("Compute", "memory://x", || {
            order.lock().unwrap().push("start");
            async { Ok(()) }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(*order.lock().unwrap(), ["start"]);
    }
}
