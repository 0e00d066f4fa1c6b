use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{a2a, analytics, api, health, pages};

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(pages::router())
        .merge(api::router())
        .merge(a2a::router())
        .merge(analytics::router())
        .merge(health::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
