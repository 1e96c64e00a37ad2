use std::{sync::Arc, time::Duration};

use mtp_repository::ProviderGeoUpdate;

use crate::{
    error::NodeError,
    periodic::deps::{GeoApi, ProviderStore},
    utils::with_timeout,
};

pub(crate) const SUCCESS_INTERVAL: Duration = Duration::from_secs(240 * 60);
pub(crate) const FAILURE_INTERVAL: Duration = Duration::from_secs(30);

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
/// The public geo endpoint rate-limits aggressively; one lookup per second
/// keeps the node under its threshold.
const INTER_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Attaches geolocation blobs to providers whose IP is known.
pub(crate) struct GeoEnrichTask {
    providers: Arc<dyn ProviderStore>,
    geo: Arc<dyn GeoApi>,
}

impl GeoEnrichTask {
    pub(crate) fn new(providers: Arc<dyn ProviderStore>, geo: Arc<dyn GeoApi>) -> Self {
        Self { providers, geo }
    }

    pub(crate) async fn run(self, shutdown: tokio_util::sync::CancellationToken) {
        crate::periodic::runner::run_with_shutdown("geo_enrich", shutdown, FAILURE_INTERVAL, || {
            self.execute()
        })
        .await;
    }

    #[tracing::instrument(name = "periodic.geo_enrich", skip(self))]
    pub(crate) async fn execute(&self) -> Result<Duration, NodeError> {
        let ips = self.providers.get_provider_ips().await?;
        if ips.is_empty() {
            tracing::info!("no provider IPs to update");
            return Ok(SUCCESS_INTERVAL);
        }

        let mut updates = Vec::with_capacity(ips.len());

        for entry in &ips {
            tokio::time::sleep(INTER_REQUEST_DELAY).await;

            let info = match with_timeout(
                "geo lookup",
                LOOKUP_TIMEOUT,
                self.geo.get_ip_info(&entry.ip),
            )
            .await
            {
                Ok(info) => info,
                Err(error) => {
                    tracing::error!(ip = %entry.ip, error = %error, "failed to get IP info");
                    continue;
                }
            };

            let blob = match serde_json::to_string(&info) {
                Ok(blob) => blob,
                Err(error) => {
                    tracing::error!(ip = %entry.ip, error = %error, "failed to encode IP info");
                    continue;
                }
            };

            updates.push(ProviderGeoUpdate {
                public_key: entry.public_key.clone(),
                ip_info: blob,
            });
        }

        self.providers.update_geo(&updates).await?;

        tracing::info!(count = updates.len(), "updated provider IP info");

        Ok(SUCCESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use mtp_geo::GeoInfo;
    use mtp_repository::ProviderIp;

    use super::*;
    use crate::periodic::tasks::testutil::{MockGeo, MockStore};

    const KEY_A: &str = "aa5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964";

    #[tokio::test]
    async fn stores_geo_blob_verbatim() {
        let store = Arc::new(MockStore::default());
        store.provider_ips.lock().unwrap().push(ProviderIp {
            public_key: KEY_A.to_string(),
            ip: "10.0.0.1".to_string(),
        });

        let mut geo = MockGeo::default();
        geo.answers.insert(
            "10.0.0.1".to_string(),
            GeoInfo {
                ip: "10.0.0.1".to_string(),
                country: "Germany".to_string(),
                country_iso: "DE".to_string(),
                city: "Falkenstein".to_string(),
                time_zone: "Europe/Berlin".to_string(),
            },
        );

        GeoEnrichTask::new(Arc::clone(&store) as _, Arc::new(geo))
            .execute()
            .await
            .unwrap();

        let updates = store.geo_updates.lock().unwrap();
        assert_eq!(updates.len(), 1);

        let blob: GeoInfo = serde_json::from_str(&updates[0].ip_info).unwrap();
        assert_eq!(blob.country_iso, "DE");
        assert_eq!(blob.city, "Falkenstein");
    }

    #[tokio::test]
    async fn failed_lookups_are_skipped_not_fatal() {
        let store = Arc::new(MockStore::default());
        {
            let mut ips = store.provider_ips.lock().unwrap();
            ips.push(ProviderIp {
                public_key: KEY_A.to_string(),
                ip: "10.0.0.1".to_string(),
            });
            ips.push(ProviderIp {
                public_key: "bb5cbb385e212898068249a24ee222ad2a1e3535a107c013e9e588bd33623964"
                    .to_string(),
                ip: "10.0.0.2".to_string(),
            });
        }

        let mut geo = MockGeo::default();
        geo.answers.insert(
            "10.0.0.2".to_string(),
            GeoInfo {
                ip: "10.0.0.2".to_string(),
                country: "Finland".to_string(),
                country_iso: "FI".to_string(),
                city: "Helsinki".to_string(),
                time_zone: "Europe/Helsinki".to_string(),
            },
        );

        GeoEnrichTask::new(Arc::clone(&store) as _, Arc::new(geo))
            .execute()
            .await
            .unwrap();

        let updates = store.geo_updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].ip_info.contains("FI"));
    }
}
