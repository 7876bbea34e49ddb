//! R2S session server binary.
//!
//! Serves the session API (`/api/sessions`, `/api/db-status`) and the
//! timetable export (`/api/download-csv`) over an in-memory session store.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin r2s-server
//! PORT=9000 RUST_LOG=debug cargo run --bin r2s-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8000)
//! - `RUST_LOG`: Log filter (default: info)
//!
//! Settings can also come from `r2s.toml` (`[server] host`, `port`).

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use r2s_workspace::config::WorkspaceConfig;
use r2s_workspace::db::RepositoryFactory;
use r2s_workspace::http::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting R2S session server");

    let config = WorkspaceConfig::load()?;

    // The server is the session store, so it always keeps sessions itself.
    let repository = RepositoryFactory::create_local();
    info!("Session store initialized");

    let app = create_router(AppState::new(repository));

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
