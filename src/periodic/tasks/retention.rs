use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mtp_repository::RepositoryManager;

use crate::error::NodeError;

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(5);

/// History deletes the sweeper needs; each table is independent.
#[async_trait]
pub(crate) trait HistoryCleaner: Send + Sync {
    async fn clean_providers_history(&self, days: i32) -> Result<u64, NodeError>;
    async fn clean_statuses_history(&self, days: i32) -> Result<u64, NodeError>;
    async fn clean_benchmarks_history(&self, days: i32) -> Result<u64, NodeError>;
    async fn clean_telemetry_history(&self, days: i32) -> Result<u64, NodeError>;
}

#[async_trait]
impl HistoryCleaner for RepositoryManager {
    async fn clean_providers_history(&self, days: i32) -> Result<u64, NodeError> {
        Ok(self.provider_repository().clean_history(days).await?)
    }

    async fn clean_statuses_history(&self, days: i32) -> Result<u64, NodeError> {
        Ok(self.status_repository().clean_history(days).await?)
    }

    async fn clean_benchmarks_history(&self, days: i32) -> Result<u64, NodeError> {
        Ok(self.benchmark_repository().clean_history(days).await?)
    }

    async fn clean_telemetry_history(&self, days: i32) -> Result<u64, NodeError> {
        Ok(self.telemetry_repository().clean_history(days).await?)
    }
}

/// Deletes history rows older than the retention horizon. One failing table
/// does not stop the others; it only shortens the next tick.
pub(crate) struct RetentionTask {
    cleaner: Arc<dyn HistoryCleaner>,
    days: i32,
}

impl RetentionTask {
    pub(crate) fn new(cleaner: Arc<dyn HistoryCleaner>, days: i32) -> Self {
        Self { cleaner, days }
    }

    pub(crate) async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        crate::periodic::runner::run_with_shutdown("retention", shutdown, FAILURE_INTERVAL, || {
            self.execute()
        })
        .await;
    }

    #[tracing::instrument(name = "periodic.retention", skip(self))]
    pub(crate) async fn execute(&self) -> Result<Duration, NodeError> {
        let mut interval = SUCCESS_INTERVAL;

        match self.cleaner.clean_providers_history(self.days).await {
            Ok(removed) if removed > 0 => {
                tracing::info!(removed, "cleaned old providers history");
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(days = self.days, error = %error, "failed to clean old providers history");
                interval = FAILURE_INTERVAL;
            }
        }

        match self.cleaner.clean_statuses_history(self.days).await {
            Ok(removed) if removed > 0 => {
                tracing::info!(removed, "cleaned old statuses history");
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(days = self.days, error = %error, "failed to clean old statuses history");
                interval = FAILURE_INTERVAL;
            }
        }

        match self.cleaner.clean_benchmarks_history(self.days).await {
            Ok(removed) if removed > 0 => {
                tracing::info!(removed, "cleaned old benchmarks history");
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(days = self.days, error = %error, "failed to clean old benchmarks history");
                interval = FAILURE_INTERVAL;
            }
        }

        match self.cleaner.clean_telemetry_history(self.days).await {
            Ok(removed) if removed > 0 => {
                tracing::info!(removed, "cleaned old telemetry history");
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(days = self.days, error = %error, "failed to clean old telemetry history");
                interval = FAILURE_INTERVAL;
            }
        }

        Ok(interval)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MockCleaner {
        calls: Mutex<Vec<(&'static str, i32)>>,
        fail_statuses: bool,
    }

    #[async_trait]
    impl HistoryCleaner for MockCleaner {
        async fn clean_providers_history(&self, days: i32) -> Result<u64, NodeError> {
            self.calls.lock().unwrap().push(("providers", days));
            Ok(0)
        }

        async fn clean_statuses_history(&self, days: i32) -> Result<u64, NodeError> {
            self.calls.lock().unwrap().push(("statuses", days));
            if self.fail_statuses {
                return Err(NodeError::Other("statuses table is locked".to_string()));
            }
            Ok(3)
        }

        async fn clean_benchmarks_history(&self, days: i32) -> Result<u64, NodeError> {
            self.calls.lock().unwrap().push(("benchmarks", days));
            Ok(1)
        }

        async fn clean_telemetry_history(&self, days: i32) -> Result<u64, NodeError> {
            self.calls.lock().unwrap().push(("telemetry", days));
            Ok(0)
        }
    }

    #[tokio::test]
    async fn sweeps_every_table_with_configured_days() {
        let cleaner = Arc::new(MockCleaner::default());
        let interval = RetentionTask::new(Arc::clone(&cleaner) as _, 90)
            .execute()
            .await
            .unwrap();

        assert_eq!(interval, SUCCESS_INTERVAL);
        let calls = cleaner.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("providers", 90),
                ("statuses", 90),
                ("benchmarks", 90),
                ("telemetry", 90)
            ]
        );
    }

    #[tokio::test]
    async fn one_failing_table_shortens_interval_but_sweeps_the_rest() {
        let cleaner = Arc::new(MockCleaner {
            fail_statuses: true,
            ..Default::default()
        });

        let interval = RetentionTask::new(Arc::clone(&cleaner) as _, 30)
            .execute()
            .await
            .unwrap();

        assert_eq!(interval, FAILURE_INTERVAL);
        assert_eq!(cleaner.calls.lock().unwrap().len(), 4);
    }
}
