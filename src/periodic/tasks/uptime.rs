use std::{sync::Arc, time::Duration};

use crate::{error::NodeError, periodic::deps::ProviderStore};

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(5);

/// Rolls liveness history up into `providers.uptime`. The heavy lifting is
/// one SQL statement; this task only owns the cadence.
pub(crate) struct UptimeTask {
    providers: Arc<dyn ProviderStore>,
}

impl UptimeTask {
    pub(crate) fn new(providers: Arc<dyn ProviderStore>) -> Self {
        Self { providers }
    }

    pub(crate) async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        crate::periodic::runner::run_with_shutdown("uptime", shutdown, FAILURE_INTERVAL, || {
            self.execute()
        })
        .await;
    }

    #[tracing::instrument(name = "periodic.uptime", skip(self))]
    pub(crate) async fn execute(&self) -> Result<Duration, NodeError> {
        self.providers.update_uptime().await?;
        Ok(SUCCESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::periodic::tasks::testutil::MockStore;

    #[tokio::test]
    async fn tick_triggers_one_rollup() {
        let store = Arc::new(MockStore::default());
        let interval = UptimeTask::new(Arc::clone(&store) as _)
            .execute()
            .await
            .unwrap();

        assert_eq!(interval, SUCCESS_INTERVAL);
        assert_eq!(*store.uptime_rollups.lock().unwrap(), 1);
    }
}
