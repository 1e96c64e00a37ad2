use std::sync::Arc;

use governor::middleware::NoOpMiddleware;
use serde::Deserialize;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};

/// Token-bucket rate limiting per client IP. Providers push telemetry once
/// a minute, so the defaults leave plenty of headroom for well-behaved
/// agents while capping scrapers.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RateLimiterConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Time window in seconds over which `max_requests` applies.
    #[serde(default = "default_time_window_seconds")]
    pub time_window_seconds: u64,

    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Burst capacity; defaults to `max_requests` when unset.
    #[serde(default)]
    pub burst_size: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

fn default_time_window_seconds() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    120
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            time_window_seconds: default_time_window_seconds(),
            max_requests: default_max_requests(),
            burst_size: None,
        }
    }
}

impl RateLimiterConfig {
    pub(crate) fn effective_burst_size(&self) -> u32 {
        self.burst_size.unwrap_or(self.max_requests)
    }

    /// Builds the limiter layer; `None` when disabled.
    pub(crate) fn build_layer(
        &self,
    ) -> Option<GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware>> {
        if !self.enabled {
            return None;
        }

        let replenish_interval_ms =
            (self.time_window_seconds * 1000) / u64::from(self.max_requests.max(1));

        let config = Arc::new(
            GovernorConfigBuilder::default()
                .per_millisecond(replenish_interval_ms.max(1))
                .burst_size(self.effective_burst_size())
                .finish()
                .expect("Failed to build governor config"),
        );

        Some(GovernorLayer { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_agent_cadence() {
        let config = RateLimiterConfig::default();
        assert!(config.enabled);
        assert_eq!(config.time_window_seconds, 60);
        assert_eq!(config.max_requests, 120);
        assert_eq!(config.effective_burst_size(), 120);
    }

    #[test]
    fn explicit_burst_size_wins() {
        let config = RateLimiterConfig {
            burst_size: Some(10),
            ..Default::default()
        };
        assert_eq!(config.effective_burst_size(), 10);
    }

    #[test]
    fn disabled_limiter_builds_no_layer() {
        let config = RateLimiterConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(config.build_layer().is_none());
    }

    #[test]
    fn enabled_limiter_builds_layer() {
        assert!(RateLimiterConfig::default().build_layer().is_some());
    }
}
