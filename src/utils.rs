use std::{future::Future, time::Duration};

use crate::error::NodeError;

/// Wraps an operation in a per-call deadline, mapping expiry to
/// `NodeError::Timeout` with the operation name for the log line.
pub(crate) async fn with_timeout<T, E, Fut>(
    operation: &'static str,
    budget: Duration,
    fut: Fut,
) -> Result<T, NodeError>
where
    Fut: Future<Output = Result<T, E>>,
    NodeError: From<E>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result.map_err(NodeError::from),
        Err(_) => Err(NodeError::Timeout(operation)),
    }
}

/// Retries a fallible async operation up to `attempts` times with a fixed
/// gap between tries.
pub(crate) async fn try_n_times<T, E, F, Fut>(
    attempts: u32,
    gap: Duration,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = None;

    for attempt in 0..attempts.max(1) {
        if attempt > 0 {
            tokio::time::sleep(gap).await;
        }

        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => last_err = Some(err),
        }
    }

    Err(last_err.expect("at least one attempt is always made"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn try_n_times_stops_on_first_success() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, &str> = try_n_times(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n == 1 { Ok(n) } else { Err("not yet") } }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn try_n_times_returns_last_error() {
        let result: Result<(), &str> =
            try_n_times(3, Duration::from_millis(1), || async { Err("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");
    }
}
