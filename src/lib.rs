mod bootstrap;
mod config;
mod context;
mod controllers;
mod error;
mod logger;
mod periodic;
mod runtime;
mod services;
mod state;
mod types;
mod utils;

use std::sync::Arc;

pub async fn run() {
    dotenvy::dotenv().ok();

    let config = Arc::new(config::initialize_configuration());
    logger::initialize(&config.logger);

    display_registry_ascii_art();

    let core = bootstrap::build_core(Arc::clone(&config)).await;

    runtime::run(core).await;
}

fn display_registry_ascii_art() {
    tracing::info!("███╗   ███╗████████╗██████╗  ██████╗ ");
    tracing::info!("████╗ ████║╚══██╔══╝██╔══██╗██╔═══██╗");
    tracing::info!("██╔████╔██║   ██║   ██████╔╝██║   ██║");
    tracing::info!("██║╚██╔╝██║   ██║   ██╔═══╝ ██║   ██║");
    tracing::info!("██║ ╚═╝ ██║   ██║   ██║     ╚██████╔╝");
    tracing::info!("╚═╝     ╚═╝   ╚═╝   ╚═╝      ╚═════╝ ");
    tracing::info!("======================================================");
    tracing::info!(
        "        myTONprovider backend v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("======================================================");
}
