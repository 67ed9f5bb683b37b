use std::sync::Arc;

use tracing::info;

use kcs_portal::database::Database;
use kcs_portal::{app, config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up KCS_DATABASE_PATH etc.
    let _ = dotenvy::dotenv();

    let config = config::config();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Starting KCS Portal in {:?} mode", config.environment);

    // Open + migrate are the only fatal store failures; everything after
    // boot is retried or surfaced per request.
    let db = Database::open(&config.database.path).await?;
    db.run_migrations().await?;
    let state = AppState { db: Arc::new(db) };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server.port)).await?;
    info!("KCS Portal listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Orderly close of the store handle before exit
    state.db.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
