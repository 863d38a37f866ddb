mod app;
mod catalogue;
mod config;
mod error;
mod routes;
mod state;

#[cfg(test)]
mod test_support;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        backend_url = %config.backend_url,
        data_dir = %config.data_dir.display(),
        snapshot_path = %config.snapshot_path.display(),
        "Starting Terra dashboard server"
    );

    let regions = match catalogue::load_regions(&config.regions_path).await {
        Ok(regions) => regions,
        Err(e) => {
            tracing::error!(error = %e, "failed to load region catalogue");
            return;
        }
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let state = match AppState::new(config, regions) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to build upstream HTTP client");
            return;
        }
    };

    let app = app::build_app(state);

    tracing::info!("Terra dashboard server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
