mod a2a;
mod analytics;
mod api;
mod bootstrap;
mod health;
mod pages;
mod rate_limit;
mod routes;
mod service;
mod state;
mod templates;

use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use transpak_core::config::{AppConfig, LoadOptions, LoggingConfig};

fn init_logging(config: &LoggingConfig) {
    use tracing::Level;
    use transpak_core::config::LogFormat::*;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        address = %address,
        ai_agents = app.config.llm.readiness(),
        "transpak-server listening"
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let router = routes::app_router(app.state.clone());
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        finished = &mut server => {
            finished??;
            app.db_pool.close().await;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "transpak-server draining in-flight requests"
    );
    let _ = stop_tx.send(());

    let drain = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(drain, &mut server).await {
        Ok(finished) => finished??,
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                drain_secs = drain.as_secs(),
                "in-flight requests did not finish before the shutdown deadline"
            );
            server.abort();
        }
    }

    app.db_pool.close().await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "transpak-server stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(event_name = "system.server.signal_error", error = %error);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(event_name = "system.server.signal_error", error = %error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
