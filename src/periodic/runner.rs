use std::{
    future::Future,
    time::{Duration, Instant},
};

use mtp_observability::{record_task_cadence, record_task_run};
use tokio_util::sync::CancellationToken;

use crate::error::NodeError;

/// Drives one periodic worker: run a tick, sleep for the interval it asks
/// for, repeat until shutdown. A failed tick is logged, counted, and retried
/// after `failure_interval` instead of the normal cadence. Doubles as the
/// metrics adapter measuring every tick, so workers carry no wrappers of
/// their own.
pub(crate) async fn run_with_shutdown<F, Fut>(
    task_name: &'static str,
    shutdown: CancellationToken,
    failure_interval: Duration,
    mut run_once: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Duration, NodeError>>,
{
    loop {
        let started = Instant::now();

        let delay = match run_once().await {
            Ok(interval) => {
                record_task_run(task_name, "ok", started.elapsed());
                interval
            }
            Err(error) => {
                tracing::error!(task = task_name, error = %error, "periodic tick failed");
                record_task_run(task_name, "error", started.elapsed());
                failure_interval
            }
        };

        let delay = delay.max(Duration::from_secs(1));
        record_task_cadence(task_name, delay);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => {
                tracing::info!(task = task_name, "Periodic task shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    #[tokio::test]
    async fn runner_stops_on_cancellation() {
        let shutdown = CancellationToken::new();
        let ticks = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&ticks);
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            run_with_shutdown("test", token, Duration::from_millis(5), move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Duration::from_secs(60))
                }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        handle.await.unwrap();

        // One tick ran, then the runner slept and saw the cancellation.
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_tick_is_retried_at_failure_interval() {
        let shutdown = CancellationToken::new();
        let ticks = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&ticks);
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            run_with_shutdown("test", token, Duration::from_millis(1), move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<Duration, _>(NodeError::Other("tick failed".to_string()))
                }
            })
            .await;
        });

        // The runner clamps sleeps to one second; after ~1.1s at least a
        // second tick must have started.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }
}
