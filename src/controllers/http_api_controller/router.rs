use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::{
    middleware::{AuthConfig, RateLimiterConfig},
    v1::{providers_controller, telemetry_controller},
};
use crate::context::Context;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HttpApiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub port: u16,
    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_enabled() -> bool {
    true
}

/// Telemetry payloads carry ping matrices and benchmark blobs; 10 MB is
/// far above any honest submission.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

pub(crate) struct HttpApiRouter {
    config: HttpApiConfig,
    router: Router,
}

impl HttpApiRouter {
    pub(crate) fn new(config: &HttpApiConfig, context: &Arc<Context>) -> Self {
        // Operator endpoints sit behind the token check; the public surface
        // does not.
        let protected = Router::new()
            .route(
                "/api/v1/telemetry/latest",
                get(telemetry_controller::latest_telemetry),
            )
            .layer(config.auth.build_layer());

        let mut router = Router::new()
            .route(
                "/api/v1/providers/search",
                post(providers_controller::search_providers),
            )
            .route(
                "/api/v1/providers/{pubkey}/contracts",
                get(providers_controller::contract_checks),
            )
            .route(
                "/api/v1/telemetry",
                post(telemetry_controller::update_telemetry),
            )
            .route(
                "/api/v1/benchmarks",
                post(telemetry_controller::update_benchmarks),
            )
            .merge(protected)
            .route("/healthz", get(telemetry_controller::health))
            .with_state(Arc::clone(context));

        if let Some(layer) = config.rate_limiter.build_layer() {
            router = router.layer(layer);
            tracing::info!(
                "Rate limiter enabled: {} requests per {} seconds (burst: {})",
                config.rate_limiter.max_requests,
                config.rate_limiter.time_window_seconds,
                config.rate_limiter.effective_burst_size()
            );
        } else {
            tracing::info!("Rate limiter disabled");
        }

        router = router.layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE));
        router = router.layer(TraceLayer::new_for_http());
        router = router.layer(CorsLayer::permissive());

        HttpApiRouter {
            config: config.to_owned(),
            router,
        }
    }

    pub(crate) async fn listen_and_serve(self, shutdown: CancellationToken) {
        if !self.config.enabled {
            tracing::info!("HTTP API disabled by configuration");
            return;
        }

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port));

        let listener = TcpListener::bind(addr)
            .await
            .expect("Failed to bind HTTP listener");

        tracing::info!(%addr, "HTTP API listening");

        // Client IPs reach the rate limiter through connect info.
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully");
        })
        .await
        .expect("Server failed");
    }
}
