// src/main.rs
use std::net::SocketAddr;
use std::time::Duration;

use axum_server::Handle;
use dotenvy::dotenv;
use minivote::{create_routes, db, AppState, Config};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("minivote=info,tower_http=info")),
        )
        .init();

    let config = Config::load()?;
    let port = config.port;

    let state = match config.database_url.clone() {
        Some(database_url) => {
            let pool = db::create_pool(&database_url, config.max_connections).await?;
            db::run_migrations(&pool).await?;
            AppState::postgres(pool, config)
        }
        None => {
            warn!("DATABASE_URL not set, polls and accounts are kept in memory only");
            AppState::in_memory(config)
        }
    };

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    let address = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server running on {address}");

    axum_server::bind(address)
        .handle(handle)
        .serve(create_routes(state).into_make_service())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down...");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
