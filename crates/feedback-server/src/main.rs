mod config;

use std::sync::Arc;

use tracing::{info, warn};

use feedback_api::auth::{AppState, AppStateInner};
use feedback_api::session::SessionConfig;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "feedback_board=debug,feedback_api=debug,feedback_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    if config.has_placeholder_secret() {
        warn!("FEEDBACK_SESSION_SECRET is unset or a placeholder; sessions can be forged. Set it before deploying.");
    }

    // Init database
    let db = feedback_db::Database::open(&config.db_path)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        session: SessionConfig {
            secret: config.session_secret.clone(),
            ttl_hours: config.session_ttl_hours,
            cookie_secure: config.cookie_secure,
        },
    });

    let app = feedback_api::router(state);

    info!("Feedback board listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
