use std::sync::Arc;

use dockpit_config::LogFormat;
use dockpit_gateway::{build_router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match dockpit_config::load_from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("failed to load configuration: {error}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    let state = AppState::new(&config);
    let watchdog = Arc::new(dockpit_watchdog::Watchdog::new(state.projects.clone()));
    dockpit_watchdog::spawn(watchdog, config.watchdog_interval_secs);

    let router = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, addr = %config.bind_addr, "failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %config.bind_addr, "dockpit-gateway listening");
    if let Err(error) = axum::serve(listener, router.into_make_service()).await {
        tracing::error!(%error, "server exited with error");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
