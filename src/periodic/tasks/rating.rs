use std::{sync::Arc, time::Duration};

use crate::{error::NodeError, periodic::deps::ProviderStore};

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(5);

/// Recomputes the composite rating for every initialized provider. The
/// formula lives in SQL so the whole recompute is atomic against concurrent
/// telemetry writes.
pub(crate) struct RatingTask {
    providers: Arc<dyn ProviderStore>,
}

impl RatingTask {
    pub(crate) fn new(providers: Arc<dyn ProviderStore>) -> Self {
        Self { providers }
    }

    pub(crate) async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        crate::periodic::runner::run_with_shutdown("rating", shutdown, FAILURE_INTERVAL, || {
            self.execute()
        })
        .await;
    }

    #[tracing::instrument(name = "periodic.rating", skip(self))]
    pub(crate) async fn execute(&self) -> Result<Duration, NodeError> {
        self.providers.update_rating().await?;
        Ok(SUCCESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::periodic::tasks::testutil::MockStore;

    #[tokio::test]
    async fn tick_triggers_one_recompute() {
        let store = Arc::new(MockStore::default());
        RatingTask::new(Arc::clone(&store) as _)
            .execute()
            .await
            .unwrap();

        assert_eq!(*store.rating_recomputes.lock().unwrap(), 1);
    }
}
