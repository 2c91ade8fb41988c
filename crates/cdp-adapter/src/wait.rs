//! Readiness waits expressed as bounded polls over a predicate.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::AdapterError;

#[derive(Clone, Copy, Debug)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            interval: Duration::from_millis(100),
        }
    }
}

/// Run `probe` until it yields a value or the timeout elapses.
///
/// Probe errors are treated as "not ready yet": a page in the middle of a navigation
/// routinely fails queries that succeed a moment later.
pub async fn poll_until<T, E, F, Fut>(options: WaitOptions, mut probe: F) -> Option<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + options.timeout;
    loop {
        match probe().await {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {}
            Err(err) => debug!(target: "cdp-adapter", %err, "readiness probe failed"),
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(options.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn poll_returns_first_ready_value() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let options = WaitOptions::new(Duration::from_secs(1), Duration::from_millis(1));
        let value = poll_until(options, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AdapterError>((n == 2).then_some(n))
        })
        .await;
        assert_eq!(value, Some(2));
    }

    #[tokio::test]
    async fn poll_gives_up_after_timeout() {
        let options = WaitOptions::new(Duration::from_millis(20), Duration::from_millis(5));
        let value: Option<()> = poll_until(options, || async { Ok::<_, AdapterError>(None) }).await;
        assert!(value.is_none());
    }
}
