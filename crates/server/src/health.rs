use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use transpak_db::ping;

use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub database: &'static str,
    pub ai_agents: &'static str,
    pub web_server: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub services: ServiceStatus,
    pub version: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match ping(&state.db_pool).await {
        Ok(()) => "connected",
        Err(error) => {
            warn!(event_name = "system.health.database_unreachable", error = %error, "ping failed");
            "disconnected"
        }
    };
    let healthy = database == "connected";

    let payload = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: Utc::now().to_rfc3339(),
        services: ServiceStatus {
            database,
            ai_agents: state.config.llm.readiness(),
            web_server: "running",
        },
        version: env!("CARGO_PKG_VERSION"),
    };

    let status_code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
