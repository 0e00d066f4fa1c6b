use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use transpak_db::RepositoryError;

use crate::state::AppState;

pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 365;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analytics/api/metrics", get(metrics))
        .route("/api/dashboard/quote-analytics", get(quote_analytics))
        .route("/api/dashboard/agent-performance", get(agent_performance))
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

fn clamp_days(days: Option<u32>) -> u32 {
    days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
}

async fn metrics(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let analytics = state.analytics();
    let figures = async {
        let daily_quotes = analytics.daily_quote_counts(DEFAULT_DAYS, Utc::now()).await?;
        let popular_routes = analytics.popular_routes().await?;
        let processing_stats = analytics.processing_stats().await?;
        let agent_activity = analytics.history_action_counts().await?;
        Ok::<_, RepositoryError>(json!({
            "daily_quotes": daily_quotes,
            "popular_routes": popular_routes,
            "processing_stats": processing_stats,
            "agent_activity": agent_activity,
        }))
    };

    match figures.await {
        Ok(data) => (StatusCode::OK, Json(json!({ "success": true, "data": data }))),
        Err(error) => db_error(error),
    }
}

async fn quote_analytics(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> (StatusCode, Json<Value>) {
    let days = clamp_days(query.days);
    match state.analytics().quote_analytics(days, Utc::now()).await {
        Ok(analytics) => (StatusCode::OK, Json(json!({ "success": true, "data": analytics }))),
        Err(error) => db_error(error),
    }
}

async fn agent_performance(State(state): State<AppState>) -> Json<Value> {
    let agents: Vec<Value> = state
        .runtime
        .metrics()
        .snapshot()
        .into_iter()
        .map(|agent| {
            json!({
                "agent": agent.agent,
                "calls": agent.calls,
                "successes": agent.successes,
                "success_rate": agent.success_rate(),
                "average_duration_ms": agent.average_duration_ms,
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "llm_enabled": state.runtime.llm_enabled(),
            "agents": agents,
            "registry": state.registry.status(),
            "active_sessions": state.monitor.active_sessions(),
        }
    }))
}

fn db_error(error: RepositoryError) -> (StatusCode, Json<Value>) {
    error!(event_name = "analytics.database.error", error = %error, "analytics query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "an internal error occurred" })),
    )
}
