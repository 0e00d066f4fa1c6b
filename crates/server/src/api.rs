use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use transpak_core::domain::history::{QuoteAction, QuoteHistoryEntry};
use transpak_core::domain::quote::{QuoteId, QuoteStatus};
use transpak_core::domain::shipment::ShipmentRequest;
use transpak_core::domain::user::{api_key_digest, UserId};
use transpak_core::errors::{ApplicationError, DomainError, InterfaceError};
use transpak_core::quote::{analyze_quote, ShipmentFacts};
use transpak_db::{
    QuoteHistoryRepository, QuoteRepository, RepositoryError, ShipmentRepository, UserRepository,
};

use crate::service::{persistence, submit_quote, QuoteSubmission};
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/quotes", post(create_quote))
        .route("/api/v1/quotes/{id}", get(get_quote))
        .route("/api/v1/quotes/{id}/status", post(update_status))
        .route("/api/v1/quotes/{id}/analysis", get(analyze))
        .route("/api/v1/sessions/{id}", get(get_session))
        .route("/api/test/quote", post(test_quote))
}

/// JSON error body `{success:false, error, correlation_id}`.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self(InterfaceError::NotFound { message: message.into(), correlation_id: correlation() })
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self(InterfaceError::Conflict { message: message.into(), correlation_id: correlation() })
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation(),
        })
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        Self(error.into_interface(correlation()))
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        persistence(error).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Server-side failures expose only the generic message.
        let message = if status.is_server_error() {
            error!(
                event_name = "api.error",
                correlation_id = self.0.correlation_id(),
                error = %self.0,
                "api request failed"
            );
            self.0.user_message().to_string()
        } else {
            self.0.message().to_string()
        };

        let body = json!({
            "success": false,
            "error": message,
            "correlation_id": self.0.correlation_id(),
        });
        (status, Json(body)).into_response()
    }
}

fn correlation() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateQuoteBody {
    #[serde(flatten)]
    pub shipment: ShipmentRequest,
    #[serde(default)]
    pub session_id: Option<String>,
}

async fn create_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateQuoteBody>,
) -> Result<Response, ApiError> {
    let user_id = match headers.get(API_KEY_HEADER).and_then(|value| value.to_str().ok()) {
        Some(key) => match authenticate(&state, key).await? {
            Some(user_id) => Some(user_id),
            None => {
                let body = json!({ "success": false, "error": "Invalid API key" });
                return Ok((StatusCode::UNAUTHORIZED, Json(body)).into_response());
            }
        },
        None => None,
    };

    let submission = QuoteSubmission {
        request: body.shipment,
        user_id,
        session_id: body.session_id,
        user_agent: Some("api".to_string()),
    };

    match submit_quote(&state, submission).await {
        Ok(stored) => {
            let quote = stored.quote;
            let body = json!({
                "success": true,
                "quote_id": quote.id,
                "shipment_id": stored.shipment.id,
                "reference": quote.reference,
                "total_cost": quote.total_cost,
                "cost_breakdown": quote.agent_results.cost_breakdown,
                "agent_activity": quote.agent_results.agent_activity,
                "quote_content": quote.quote_content,
                "narrative_source": stored.narrative_source,
                "guardrail": stored.guardrail,
                "session_id": stored.session_id,
            });
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        Err(ApplicationError::Domain(error @ DomainError::Validation { .. })) => {
            let body = json!({
                "success": false,
                "error": error.to_string(),
                "missing_fields": missing_fields(&error),
            });
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response())
        }
        Err(error) => Err(error.into()),
    }
}

/// Resolves an API key to an active user and records the login.
async fn authenticate(state: &AppState, key: &str) -> Result<Option<UserId>, ApiError> {
    let digest = api_key_digest(&state.session_secret, key);
    let users = state.users();
    let Some(user) = users.find_by_api_key_digest(&digest).await? else {
        return Ok(None);
    };
    if !user.is_active {
        return Ok(None);
    }
    users.touch_last_login(&user.id, Utc::now()).await?;
    Ok(Some(user.id))
}

async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let quote_id = QuoteId(id);
    let quote = state
        .quotes()
        .find_by_id(quote_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("quote {quote_id} not found")))?;
    let shipment = state.shipments().find_by_id(quote.shipment_id).await?;
    let history = state.history().list_for_quote(quote_id).await?;

    Ok(Json(json!({
        "success": true,
        "quote": quote,
        "shipment": shipment,
        "history": history,
    })))
}

async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let quote_id = QuoteId(id);
    let quote = state
        .quotes()
        .find_by_id(quote_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("quote {quote_id} not found")))?;
    let shipment = state
        .shipments()
        .find_by_id(quote.shipment_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("shipment {} not found", quote.shipment_id)))?;

    let analysis = analyze_quote(
        &quote.quote_content,
        &quote.agent_results.cost_breakdown,
        ShipmentFacts::from(&shipment),
    );
    info!(
        event_name = "quote.analysis.completed",
        quote_id = %quote_id,
        confidence_score = analysis.confidence.confidence_score,
        "quote analyzed"
    );
    Ok(Json(json!({ "success": true, "quote_id": quote_id, "analysis": analysis })))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Value>, ApiError> {
    let next = body
        .status
        .parse::<QuoteStatus>()
        .map_err(|_| ApiError::bad_request(format!("unknown status `{}`", body.status)))?;

    let quote_id = QuoteId(id);
    let mut quote = state
        .quotes()
        .find_by_id(quote_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("quote {quote_id} not found")))?;
    let current = quote.status;
    quote.transition_to(next).map_err(ApplicationError::from)?;

    // The write re-checks `current`, so a concurrent transition loses with 409.
    match state.quotes().update_status(quote_id, current, next).await {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::not_found(format!("quote {quote_id} not found"))),
        Err(RepositoryError::Conflict(message)) => return Err(ApiError::conflict(message)),
        Err(error) => return Err(error.into()),
    }
    state
        .history()
        .append(
            QuoteHistoryEntry::new(quote_id, QuoteAction::for_status(next))
                .with_user_info("source", "api"),
        )
        .await?;

    info!(
        event_name = "quote.status.changed",
        quote_id = %quote_id,
        status = next.as_str(),
        "quote status updated"
    );
    Ok(Json(json!({ "success": true, "quote_id": quote_id, "status": next })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session =
        state.monitor.session(&id).ok_or_else(|| ApiError::not_found("session not found"))?;
    Ok(Json(json!({ "success": true, "session": session })))
}

/// Validates a fixed sample shipment without storing anything.
async fn test_quote() -> (StatusCode, Json<Value>) {
    let sample = sample_shipment();
    match sample.validate() {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "validation_passed", "test_data": sample })),
        ),
        Err(error) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "validation_failed",
                "error": error.to_string(),
                "missing_fields": missing_fields(&error),
            })),
        ),
    }
}

fn missing_fields(error: &DomainError) -> &[String] {
    match error {
        DomainError::Validation { missing_fields } => missing_fields,
        _ => &[],
    }
}

fn sample_shipment() -> ShipmentRequest {
    ShipmentRequest {
        item_description: "Industrial printer".to_string(),
        dimensions: "48x36x24".to_string(),
        weight: "350 lbs".to_string(),
        origin: "San Jose, CA".to_string(),
        destination: "Austin, TX".to_string(),
        fragility: "Standard".to_string(),
        special_requirements: "Liftgate delivery".to_string(),
        timeline: "Within 2 weeks".to_string(),
        declared_value: None,
    }
}
