// Party Check-in - Web Server
// REST API with Axum over the SQLite store

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use party_checkin::api::{router, AppState};
use party_checkin::{default_seed, init_tracing, Config, Orchestrator, SqliteStore, SystemClock};

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    println!("🌐 Party Check-in - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::load()?;

    let store = Arc::new(
        SqliteStore::open(&config.database_path, config.enforce_unique)
            .with_context(|| format!("failed to open {}", config.database_path.display()))?,
    );
    info!(path = %config.database_path.display(), "database opened");

    let clock = Arc::new(SystemClock);
    let seeded = Orchestrator::new(store.clone(), clock.clone())
        .with_store_timeout(config.store_timeout)
        .bootstrap_if_empty(&default_seed())
        .await?;
    if seeded > 0 {
        info!(seeded, "seeded empty roster");
    }

    let state = AppState::new(store, clock)
        .with_store_timeout(config.store_timeout)
        .with_recent_limit(config.recent_limit);

    let app = router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/names", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    println!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
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
}
