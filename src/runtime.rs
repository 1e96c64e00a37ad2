use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    bootstrap::CoreBootstrap,
    controllers::http_api_controller::HttpApiRouter,
    periodic,
};

const PERIODIC_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);
const HTTP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the node until a termination signal: periodic workers in one task
/// group, the HTTP server in another, both wired to the same cancellation
/// token.
pub(crate) async fn run(core: CoreBootstrap) {
    let shutdown = CancellationToken::new();

    let periodic_handle = tokio::task::spawn(periodic::run_all(
        core.periodic_deps,
        core.periodic_params,
        shutdown.clone(),
    ));

    let http_router = HttpApiRouter::new(&core.context.config().http_api, &core.context);
    let http_handle = tokio::task::spawn(http_router.listen_and_serve(shutdown.clone()));

    wait_for_signal().await;
    tracing::info!("Shutting down gracefully...");

    // One token stops everything: the HTTP server drains in-flight
    // requests, workers finish their current tick.
    shutdown.cancel();

    join_with_timeout("periodic tasks", periodic_handle, PERIODIC_SHUTDOWN_TIMEOUT).await;
    join_with_timeout("HTTP server", http_handle, HTTP_SHUTDOWN_TIMEOUT).await;

    tracing::info!("Shutdown complete");
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn join_with_timeout(name: &str, mut handle: JoinHandle<()>, budget: Duration) {
    match tokio::time::timeout(budget, &mut handle).await {
        Ok(Ok(())) => tracing::info!("{name} shut down cleanly"),
        Ok(Err(error)) => tracing::error!("{name} panicked: {error:?}"),
        Err(_) => {
            tracing::warn!(
                timeout_secs = budget.as_secs(),
                "{name} shutdown timeout, aborting"
            );
            handle.abort();
            let _ = handle.await;
        }
    }
}
