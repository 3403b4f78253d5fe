use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::ServiceExt;
use axum::extract::Request;
use tracing::{info, warn};

use roost_api::app;
use roost_api::geocode::MapboxGeocoder;
use roost_api::images::DiskImageStore;
use roost_api::state::AppState;
use roost_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roost=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("ROOST_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("ROOST_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()?;
    let db_path = std::env::var("ROOST_DB_PATH").unwrap_or_else(|_| "roost.db".to_string());
    let uploads_dir =
        std::env::var("ROOST_UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string());
    let session_ttl_days: i64 = std::env::var("ROOST_SESSION_TTL_DAYS")
        .unwrap_or_else(|_| "7".to_string())
        .parse()?;
    let mapbox_token = std::env::var("MAPBOX_TOKEN").unwrap_or_default();
    if mapbox_token.is_empty() {
        warn!("MAPBOX_TOKEN is not set, geocoding requests will be rejected upstream");
    }

    // Init database
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);
    info!("Database ready at {}", db_path);

    let state = AppState::new(
        db,
        Arc::new(MapboxGeocoder::new(mapbox_token)),
        Arc::new(DiskImageStore::new(PathBuf::from(uploads_dir))),
        session_ttl_days,
    );

    // The method override runs before routing, so the app is served as a
    // plain service rather than a `Router`.
    let app = app::service(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Roost server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}
