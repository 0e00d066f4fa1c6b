//! Server-rendered pages.
//!
//! - `GET  /`                    shipment form
//! - `POST /generate_quote`      form submission (rate limited)
//! - `GET  /new_quote`           redirect to the form
//! - `GET  /quote/{id}`          quote detail
//! - `GET  /quotes`              paginated quote list
//! - `GET  /download_quote/{id}` quote document as a text attachment
//! - `GET  /admin`               dashboard

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tera::Context;
use tracing::{error, warn};

use transpak_core::domain::history::{ActionCount, QuoteAction, QuoteHistoryEntry};
use transpak_core::domain::quote::{Quote, QuoteId};
use transpak_core::domain::shipment::{Fragility, Shipment, ShipmentRequest};
use transpak_core::errors::{ApplicationError, DomainError};
use transpak_core::pricing::format_usd;
use transpak_db::{
    ping, QuoteHistoryRepository, QuoteRepository, RepositoryError, ShipmentRepository,
};

use crate::rate_limit::{client_key, RateDecision};
use crate::service::{submit_quote, QuoteSubmission};
use crate::state::AppState;
use crate::templates;

pub const QUOTES_PER_PAGE: u32 = 10;
pub const RECENT_QUOTES: u32 = 5;
const GENERATION_FAILED: &str =
    "An error occurred while generating your quote. Please try again.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/generate_quote", post(generate_quote))
        .route("/new_quote", get(new_quote))
        .route("/quote/{id}", get(view_quote))
        .route("/quotes", get(list_quotes))
        .route("/download_quote/{id}", get(download_quote))
        .route("/admin", get(admin))
}

/// Form values echoed back into the template; every field renders as text.
#[derive(Debug, Default, Serialize)]
struct FormView {
    item_description: String,
    dimensions: String,
    weight: String,
    origin: String,
    destination: String,
    fragility: String,
    special_requirements: String,
    timeline: String,
    declared_value: String,
}

impl From<&ShipmentRequest> for FormView {
    fn from(request: &ShipmentRequest) -> Self {
        Self {
            item_description: request.item_description.clone(),
            dimensions: request.dimensions.clone(),
            weight: request.weight.clone(),
            origin: request.origin.clone(),
            destination: request.destination.clone(),
            fragility: request.fragility.clone(),
            special_requirements: request.special_requirements.clone(),
            timeline: request.timeline.clone(),
            declared_value: request.declared_value.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CostLine {
    label: &'static str,
    amount: String,
}

#[derive(Debug, Serialize)]
struct QuoteRow {
    id: i64,
    reference: String,
    status: &'static str,
    total: String,
    created_at: String,
}

impl From<&Quote> for QuoteRow {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id.0,
            reference: quote.reference.clone(),
            status: quote.status.as_str(),
            total: format_usd(quote.total_cost),
            created_at: quote.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

async fn index(State(state): State<AppState>) -> Response {
    form_page(&state, StatusCode::OK, &ShipmentRequest::default(), "")
}

async fn new_quote() -> Redirect {
    Redirect::to("/")
}

async fn generate_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(request): Form<ShipmentRequest>,
) -> Response {
    if let RateDecision::Limited { retry_after_secs } =
        state.rate_limiter.check(&client_key(&headers))
    {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs.to_string())],
            Json(json!({
                "error": "Rate limit exceeded. Please wait before generating another quote.",
                "retry_after": retry_after_secs,
            })),
        )
            .into_response();
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let submission =
        QuoteSubmission { request: request.clone(), user_agent, ..QuoteSubmission::default() };

    match submit_quote(&state, submission).await {
        Ok(stored) => {
            let source = stored.narrative_source.as_str();
            quote_page(&state, &stored.quote, &stored.shipment, source)
        }
        Err(ApplicationError::Domain(error @ DomainError::Validation { .. }))
        | Err(ApplicationError::Domain(error @ DomainError::UnsupportedFragility(_)))
        | Err(ApplicationError::Domain(error @ DomainError::InvalidMeasurement { .. })) => {
            form_page(&state, StatusCode::UNPROCESSABLE_ENTITY, &request, &error.to_string())
        }
        Err(error) => {
            error!(event_name = "web.generate_quote.error", error = %error, "quote failed");
            form_page(&state, StatusCode::INTERNAL_SERVER_ERROR, &request, GENERATION_FAILED)
        }
    }
}

async fn view_quote(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let quote_id = QuoteId(id);
    let (quote, shipment) = match load_quote(&state, quote_id).await {
        Ok(Some(found)) => found,
        Ok(None) => return not_found(&state, quote_id),
        Err(error) => return db_error(&state, error),
    };

    let history = match state.history().list_for_quote(quote_id).await {
        Ok(history) => history,
        Err(error) => return db_error(&state, error),
    };
    let source = history
        .iter()
        .find(|entry| entry.action == QuoteAction::Created)
        .and_then(|entry| entry.user_info.get("narrative_source"))
        .cloned()
        .unwrap_or_default();

    let entry = QuoteHistoryEntry::new(quote_id, QuoteAction::Viewed);
    if let Err(error) = state.history().append(entry).await {
        return db_error(&state, error);
    }
    quote_page(&state, &quote, &shipment, &source)
}

async fn list_quotes(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    let page = query.page.unwrap_or(1).max(1);
    let listing = match state.quotes().list_page(page, QUOTES_PER_PAGE).await {
        Ok(listing) => listing,
        Err(error) => return db_error(&state, error),
    };

    let rows: Vec<QuoteRow> = listing.items.iter().map(QuoteRow::from).collect();
    let mut context = Context::new();
    context.insert("rows", &rows);
    context.insert(
        "page",
        &json!({
            "page": listing.page,
            "pages": listing.pages,
            "total": listing.total,
            "has_prev": listing.has_prev,
            "has_next": listing.has_next,
        }),
    );
    render(&state, templates::QUOTES, &context, StatusCode::OK)
}

async fn download_quote(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let quote_id = QuoteId(id);
    let quote = match state.quotes().find_by_id(quote_id).await {
        Ok(Some(quote)) => quote,
        Ok(None) => return not_found(&state, quote_id),
        Err(error) => return db_error(&state, error),
    };

    let entry = QuoteHistoryEntry::new(quote_id, QuoteAction::Downloaded);
    if let Err(error) = state.history().append(entry).await {
        return db_error(&state, error);
    }

    let disposition = format!("attachment; filename=\"transpak-quote-{}.txt\"", quote.id);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        quote.quote_content,
    )
        .into_response()
}

async fn admin(State(state): State<AppState>) -> Response {
    let database = if ping(&state.db_pool).await.is_ok() { "connected" } else { "disconnected" };
    let system_status = json!({
        "system": "operational",
        "database": database,
        "ai_agents": state.config.llm.readiness(),
    });

    let mut context = Context::new();
    context.insert("system_status", &system_status);
    match admin_figures(&state).await {
        Ok((shipments, quotes, recent, action_counts)) => {
            let recent: Vec<QuoteRow> = recent.iter().map(QuoteRow::from).collect();
            context.insert("total_shipments", &shipments);
            context.insert("total_quotes", &quotes);
            context.insert("recent_quotes", &recent);
            context.insert("action_counts", &action_counts);
            context.insert("error", "");
        }
        Err(error) => {
            warn!(event_name = "web.admin.degraded", error = %error, "admin figures unavailable");
            context.insert("total_shipments", &0);
            context.insert("total_quotes", &0);
            context.insert("recent_quotes", &Vec::<QuoteRow>::new());
            context.insert("action_counts", &Vec::<ActionCount>::new());
            context.insert("error", &format!("Dashboard data is unavailable: {error}"));
        }
    }
    render(&state, templates::ADMIN, &context, StatusCode::OK)
}

async fn admin_figures(
    state: &AppState,
) -> Result<(i64, i64, Vec<Quote>, Vec<ActionCount>), RepositoryError> {
    let shipments = state.shipments().count().await?;
    let quotes = state.quotes().count().await?;
    let recent = state.quotes().recent(RECENT_QUOTES).await?;
    let action_counts = state.history().action_counts().await?;
    Ok((shipments, quotes, recent, action_counts))
}

async fn load_quote(
    state: &AppState,
    quote_id: QuoteId,
) -> Result<Option<(Quote, Shipment)>, RepositoryError> {
    let Some(quote) = state.quotes().find_by_id(quote_id).await? else {
        return Ok(None);
    };
    let shipment = state.shipments().find_by_id(quote.shipment_id).await?;
    Ok(shipment.map(|shipment| (quote, shipment)))
}

fn form_page(
    state: &AppState,
    status: StatusCode,
    request: &ShipmentRequest,
    flash: &str,
) -> Response {
    let levels: Vec<&str> = Fragility::ALL.iter().map(|level| level.label()).collect();
    let mut context = Context::new();
    context.insert("form", &FormView::from(request));
    context.insert("fragility_levels", &levels);
    context.insert("flash", flash);
    render(state, templates::INDEX, &context, status)
}

fn quote_page(
    state: &AppState,
    quote: &Quote,
    shipment: &Shipment,
    narrative_source: &str,
) -> Response {
    let breakdown = &quote.agent_results.cost_breakdown;
    let cost_lines = [
        ("Packaging & Crating", breakdown.packaging_crating),
        ("Transportation", breakdown.transportation),
        ("Insurance & Documentation", breakdown.insurance_documentation),
        ("Special Handling", breakdown.special_handling),
        ("Total", breakdown.total),
    ]
    .into_iter()
    .map(|(label, amount)| CostLine { label, amount: format_usd(amount) })
    .collect::<Vec<_>>();

    let mut context = Context::new();
    context.insert("quote", quote);
    context.insert("shipment", shipment);
    context.insert("total", &format_usd(quote.total_cost));
    context.insert("created_at", &quote.created_at.format("%B %d, %Y %H:%M UTC").to_string());
    context.insert("cost_lines", &cost_lines);
    context.insert("narrative_source", narrative_source);
    render(state, templates::QUOTE, &context, StatusCode::OK)
}

fn not_found(state: &AppState, quote_id: QuoteId) -> Response {
    let mut context = Context::new();
    context.insert("message", &format!("Quote {quote_id} was not found."));
    render(state, templates::NOT_FOUND, &context, StatusCode::NOT_FOUND)
}

fn render(state: &AppState, template: &str, context: &Context, status: StatusCode) -> Response {
    match state.templates.render(template, context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(error) => {
            error!(event_name = "web.template.error", template, error = ?error, "render failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h1>Internal Server Error</h1>".to_string()),
            )
                .into_response()
        }
    }
}

fn db_error(state: &AppState, error: RepositoryError) -> Response {
    error!(event_name = "web.database.error", error = %error, "page database error");
    let mut context = Context::new();
    context.insert("message", "An internal error occurred. Please try again.");
    render(state, templates::NOT_FOUND, &context, StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use transpak_core::domain::history::QuoteAction;
    use transpak_db::{QuoteHistoryRepository, QuoteRepository, ShipmentRepository};

    use crate::routes::app_router;
    use crate::service::{submit_quote, QuoteSubmission};
    use crate::state::test_support::{offline_state, printer};

    const FORM: &str = "item_description=Industrial+printer&dimensions=48x36x24\
                        &weight=350+lbs&origin=San+Jose%2C+CA&destination=Austin%2C+TX\
                        &fragility=Standard";

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    fn form_post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate_quote")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn form_submission_renders_the_priced_quote() {
        let state = offline_state().await;
        let response = app_router(state.clone()).oneshot(form_post(FORM)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Industrial printer"));
        assert!(html.contains("$749.07"));
        assert_eq!(state.quotes().count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn missing_fields_rerender_the_form_without_saving() {
        let state = offline_state().await;
        let body = "item_description=Industrial+printer&dimensions=48x36x24";
        let response = app_router(state.clone()).oneshot(form_post(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains(
            "Please provide the following required information: Weight, Origin, Destination"
        ));
        assert!(html.contains("value=\"48x36x24\""));
        assert_eq!(state.shipments().count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn sixth_submission_from_one_client_is_rate_limited() {
        let state = offline_state().await;
        let app = app_router(state);
        for _ in 0..5 {
            let response = app.clone().oneshot(form_post("weight=1")).await.expect("response");
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        let response = app.oneshot(form_post(FORM)).await.expect("response");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("json");
        assert!(body["retry_after"].as_u64().is_some());
    }

    #[tokio::test]
    async fn viewing_and_downloading_append_history() {
        let state = offline_state().await;
        let stored = submit_quote(
            &state,
            QuoteSubmission { request: printer(), ..QuoteSubmission::default() },
        )
        .await
        .expect("submit");
        let id = stored.quote.id;
        let app = app_router(state.clone());

        let view =
            Request::builder().uri(format!("/quote/{id}")).body(Body::empty()).expect("request");
        let response = app.clone().oneshot(view).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let download = Request::builder()
            .uri(format!("/download_quote/{id}"))
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(download).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"transpak-quote-{id}.txt\"").as_str()
        );
        assert_eq!(body_text(response).await, stored.quote.quote_content);

        let actions: Vec<QuoteAction> = state
            .history()
            .list_for_quote(id)
            .await
            .expect("history")
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert!(actions.contains(&QuoteAction::Viewed));
        assert!(actions.contains(&QuoteAction::Downloaded));
    }

    #[tokio::test]
    async fn unknown_quote_and_redirect() {
        let app = app_router(offline_state().await);

        let missing = Request::builder().uri("/quote/999").body(Body::empty()).expect("request");
        let response = app.clone().oneshot(missing).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let redirect = Request::builder().uri("/new_quote").body(Body::empty()).expect("request");
        let response = app.oneshot(redirect).await.expect("response");
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn quote_list_and_admin_render() {
        let state = offline_state().await;
        submit_quote(&state, QuoteSubmission { request: printer(), ..QuoteSubmission::default() })
            .await
            .expect("submit");
        let app = app_router(state);

        let list = Request::builder().uri("/quotes?page=1").body(Body::empty()).expect("request");
        let response = app.clone().oneshot(list).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Page 1 of 1 (1 quotes)"));

        let admin = Request::builder().uri("/admin").body(Body::empty()).expect("request");
        let response = app.oneshot(admin).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Total quotes</th><td>1</td>"));
        assert!(html.contains("offline"));
    }
}
