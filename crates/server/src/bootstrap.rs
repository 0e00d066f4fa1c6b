use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use transpak_agent::transport::DEFAULT_TIMEOUT_SECS;
use transpak_agent::{client_from_config, HttpExternalTransport};
use transpak_core::a2a::ExternalTransport;
use transpak_core::config::{AppConfig, ConfigError, LoadOptions};
use transpak_db::{connect_with_config, migrations, DbPool};

use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("integration setup failed: {0}")]
    Integration(String),
    #[error("template compilation failed: {0}")]
    Templates(#[source] tera::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let llm = client_from_config(&config.llm)
        .map_err(|error| BootstrapError::Integration(format!("{error:#}")))?;
    info!(
        event_name = "system.bootstrap.agents_ready",
        correlation_id = "bootstrap",
        ai_agents = config.llm.readiness(),
        "agent runtime configured"
    );

    let transport = HttpExternalTransport::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .map_err(|error| BootstrapError::Integration(error.to_string()))?;
    let transport: Arc<dyn ExternalTransport> = Arc::new(transport);

    let session_secret = session_secret(&config);
    let state =
        AppState::new(config.clone(), db_pool.clone(), session_secret, llm, Some(transport))
            .map_err(BootstrapError::Templates)?;

    Ok(Application { config, db_pool, state })
}

/// Configured secret, else a per-process random one. API keys issued under a random
/// secret stop matching after a restart.
fn session_secret(config: &AppConfig) -> SecretString {
    if let Some(secret) = config.security.session_secret.clone() {
        return secret;
    }
    warn!(
        event_name = "system.bootstrap.ephemeral_session_secret",
        correlation_id = "bootstrap",
        "security.session_secret is not set; using a random per-process secret"
    );
    SecretString::from(format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()))
}
