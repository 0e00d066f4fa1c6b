//! HTTP surface over the in-process A2A registry, protocol and workflow, mounted under
//! `/api/v1/a2a`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use transpak_core::a2a::{
    AgentCard, AgentFramework, CapabilityQuery, CommunicationMode, CrossFrameworkOrchestrator,
    CrossFrameworkWorkflow, MessageOutcome, OutgoingMessage, HOSTING_KEY,
};

use crate::state::AppState;

pub const PROTOCOL_VERSION: &str = "1.0.0";
const AGENT_NOT_FOUND: &str = "Agent not found";
const RECEIVER_NOT_FOUND: &str = "Receiver agent not found";

pub fn router() -> Router<AppState> {
    let routes = Router::new()
        .route("/agents", get(list_agents))
        .route("/agents/discover", post(discover))
        .route("/agents/register", post(register))
        .route("/agents/{id}", get(get_agent).delete(unregister))
        .route("/agents/{id}/capabilities", get(capabilities))
        .route("/agents/{id}/skills/{skill}/query", post(query_skill))
        .route("/agents/{id}/message", post(send_message))
        .route("/agents/{id}/execute", post(execute_skill))
        .route("/skills/{skill}/agents", get(agents_for_skill))
        .route("/workflow/execute", post(execute_workflow))
        .route("/workflow/execute-enhanced", post(execute_enhanced_workflow))
        .route("/communication/negotiate", post(negotiate))
        .route("/registry/status", get(registry_status))
        .route("/test/ping", get(ping));
    Router::new().nest("/api/v1/a2a", routes)
}

#[derive(Debug)]
pub struct A2aError {
    status: StatusCode,
    message: String,
}

impl A2aError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, AGENT_NOT_FOUND)
    }
}

impl IntoResponse for A2aError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "success": false, "error": self.message }))).into_response()
    }
}

type A2aResult = Result<Response, A2aError>;

/// Empty bodies read as `null`; anything else must be JSON.
fn json_body(bytes: &Bytes) -> Result<Value, A2aError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|_| A2aError::bad_request("Invalid JSON body"))
}

fn typed_body<T>(bytes: &Bytes) -> Result<T, A2aError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match json_body(bytes)? {
        Value::Null => Ok(T::default()),
        value => serde_json::from_value(value)
            .map_err(|error| A2aError::bad_request(format!("Invalid request body: {error}"))),
    }
}

/// Failed outcomes map to 404 for a missing agent and 400 otherwise.
fn outcome_response(outcome: MessageOutcome, not_found_error: &str) -> Response {
    let status = match outcome.error.as_deref() {
        _ if outcome.success => StatusCode::OK,
        Some(error) if error == not_found_error => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(outcome)).into_response()
}

async fn list_agents(State(state): State<AppState>) -> Json<Value> {
    let agents = state.registry.list();
    Json(json!({ "success": true, "total": agents.len(), "agents": agents }))
}

async fn get_agent(State(state): State<AppState>, Path(id): Path<String>) -> A2aResult {
    let agent = state.registry.get(&id).ok_or_else(A2aError::not_found)?;
    Ok(Json(json!({ "success": true, "agent": agent })).into_response())
}

async fn capabilities(State(state): State<AppState>, Path(id): Path<String>) -> A2aResult {
    let agent = state.registry.get(&id).ok_or_else(A2aError::not_found)?;
    Ok(Json(json!({
        "success": true,
        "agent_id": agent.agent_id,
        "capabilities": agent.capabilities,
    }))
    .into_response())
}

async fn discover(State(state): State<AppState>, body: Bytes) -> A2aResult {
    let query = match json_body(&body)? {
        Value::Object(map) if !map.is_empty() => Value::Object(map),
        _ => return Err(A2aError::bad_request("Query parameters required")),
    };
    let query: CapabilityQuery = serde_json::from_value(query)
        .map_err(|error| A2aError::bad_request(format!("Invalid query: {error}")))?;

    let agents = state.registry.query_capabilities(&query);
    Ok(Json(json!({ "success": true, "total": agents.len(), "agents": agents })).into_response())
}

fn is_hosted(state: &AppState, agent_id: &str) -> bool {
    state.agents.is_builtin(agent_id) || state.validators.is_hosted(agent_id)
}

async fn register(State(state): State<AppState>, body: Bytes) -> A2aResult {
    let Value::Object(mut fields) = json_body(&body)? else {
        return Err(A2aError::bad_request("Agent card required"));
    };
    fields.insert("framework".to_string(), json!(AgentFramework::External));
    if let Some(Value::Object(metadata)) = fields.get_mut("metadata") {
        metadata.remove(HOSTING_KEY);
    }
    let mut card: AgentCard = serde_json::from_value(Value::Object(fields))
        .map_err(|error| A2aError::bad_request(format!("Invalid agent card: {error}")))?;

    if card.agent_id.trim().is_empty() {
        return Err(A2aError::bad_request("agent_id is required"));
    }
    if is_hosted(&state, &card.agent_id) {
        return Err(A2aError::new(StatusCode::CONFLICT, "Built-in agents cannot be replaced"));
    }

    card.last_updated = Utc::now();
    let agent_id = card.agent_id.clone();
    state.registry.register(card);
    info!(event_name = "a2a.agent.external_registered", agent_id = %agent_id, "agent registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "agent_id": agent_id,
            "message": "Agent registered successfully",
        })),
    )
        .into_response())
}

async fn unregister(State(state): State<AppState>, Path(id): Path<String>) -> A2aResult {
    if is_hosted(&state, &id) {
        return Err(A2aError::new(StatusCode::CONFLICT, "Built-in agents cannot be removed"));
    }
    state.registry.unregister(&id).ok_or_else(A2aError::not_found)?;
    Ok(Json(json!({ "success": true, "agent_id": id })).into_response())
}

async fn agents_for_skill(
    State(state): State<AppState>,
    Path(skill): Path<String>,
) -> Json<Value> {
    let agents = state.registry.discover_by_skill(&skill);
    Json(json!({ "success": true, "skill_id": skill, "total": agents.len(), "agents": agents }))
}

#[derive(Debug, Default, Deserialize)]
struct SkillQueryBody {
    requester_id: Option<String>,
    #[serde(default)]
    parameters: Map<String, Value>,
}

async fn query_skill(
    State(state): State<AppState>,
    Path((id, skill)): Path<(String, String)>,
    body: Bytes,
) -> A2aResult {
    let body: SkillQueryBody = typed_body(&body)?;
    let requester = body.requester_id.unwrap_or_else(|| "external_client".to_string());
    let outcome = state.negotiator.query_skill(&requester, &id, &skill, &body.parameters).await;
    Ok(outcome_response(outcome, AGENT_NOT_FOUND))
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MessageBody {
    sender_id: String,
    message_type: String,
    content: Value,
    communication_mode: String,
    conversation_id: Option<String>,
}

impl Default for MessageBody {
    fn default() -> Self {
        Self {
            sender_id: "external_client".to_string(),
            message_type: "task_request".to_string(),
            content: json!({}),
            communication_mode: "json".to_string(),
            conversation_id: None,
        }
    }
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> A2aResult {
    let body: MessageBody = typed_body(&body)?;
    let communication_mode = body
        .communication_mode
        .parse::<CommunicationMode>()
        .map_err(|error| A2aError::bad_request(error.to_string()))?;

    let outcome = state
        .protocol
        .send_message(OutgoingMessage {
            sender_id: body.sender_id,
            receiver_id: id,
            message_type: body.message_type,
            content: body.content,
            communication_mode,
            conversation_id: body.conversation_id,
        })
        .await;
    Ok(outcome_response(outcome, RECEIVER_NOT_FOUND))
}

#[derive(Debug, Default, Deserialize)]
struct ExecuteBody {
    skill_id: Option<String>,
    #[serde(default)]
    parameters: Value,
}

async fn execute_skill(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> A2aResult {
    let body: ExecuteBody = typed_body(&body)?;
    let skill_id = body
        .skill_id
        .filter(|skill| !skill.trim().is_empty())
        .ok_or_else(|| A2aError::bad_request("skill_id is required"))?;
    let parameters = if body.parameters.is_null() { json!({}) } else { body.parameters };
    let execution = match state.agents.adapter(&id) {
        Some(adapter) => adapter.execute_skill(&skill_id, &parameters),
        None => state.validators.execute_skill(&id, &skill_id, &parameters).ok_or_else(|| {
            A2aError::new(StatusCode::NOT_FOUND, "Agent not found or not executable locally")
        })?,
    };
    let status = if execution.success { StatusCode::OK } else { StatusCode::BAD_REQUEST };
    Ok((status, Json(execution)).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowBody {
    #[serde(default)]
    shipment_data: Value,
}

async fn execute_workflow(State(state): State<AppState>, body: Bytes) -> A2aResult {
    let body: WorkflowBody = typed_body(&body)?;
    if body.shipment_data.is_null() {
        return Err(A2aError::bad_request("shipment_data is required"));
    }

    let outcome = CrossFrameworkWorkflow::new(&state.agents).execute(&body.shipment_data);
    info!(
        event_name = "a2a.workflow.completed",
        workflow_id = %outcome.workflow_id,
        success = outcome.success,
        "cross-framework workflow finished"
    );
    Ok(Json(json!({ "success": outcome.success, "workflow": outcome })).into_response())
}

async fn execute_enhanced_workflow(State(state): State<AppState>, body: Bytes) -> A2aResult {
    let body: WorkflowBody = typed_body(&body)?;
    if body.shipment_data.is_null() {
        return Err(A2aError::bad_request("shipment_data is required"));
    }

    let outcome = CrossFrameworkOrchestrator::new(&state.agents, &state.validators)
        .execute(&body.shipment_data);
    Ok(Json(json!({ "success": outcome.workflow.success, "workflow": outcome })).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct NegotiateBody {
    agent_id: Option<String>,
    preferred_modes: Option<Vec<String>>,
}

async fn negotiate(State(state): State<AppState>, body: Bytes) -> A2aResult {
    let body: NegotiateBody = typed_body(&body)?;
    let agent_id = body.agent_id.ok_or_else(|| A2aError::bad_request("agent_id is required"))?;

    let mut preferred: Vec<CommunicationMode> = body
        .preferred_modes
        .unwrap_or_default()
        .iter()
        .filter_map(|mode| mode.parse().ok())
        .collect();
    if preferred.is_empty() {
        preferred.push(CommunicationMode::Text);
    }

    let negotiated = state.negotiator.negotiate_communication_mode(&agent_id, &preferred);
    Ok(Json(json!({
        "success": true,
        "agent_id": agent_id,
        "negotiated_mode": negotiated,
        "preferred_modes": preferred,
    }))
    .into_response())
}

async fn registry_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "status": state.registry.status() }))
}

async fn ping() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "A2A protocol is operational",
        "version": PROTOCOL_VERSION,
        "timestamp": Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::routes::app_router;
    use crate::state::test_support::offline_state;

    const SALES: &str = "transpak_sales_briefing_agent";

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1/a2a{uri}"))
            .header(header::CONTENT_TYPE, "application/json");
        let body = body.map(|value| Body::from(value.to_string())).unwrap_or_else(Body::empty);
        builder.body(body).expect("request")
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn builtin_agents_are_listed_and_discoverable() {
        let app = app_router(offline_state().await);

        let (status, body) = call(&app, request("GET", "/agents", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], json!(6));

        let (_, body) = call(&app, request("GET", "/skills/design_packaging/agents", None)).await;
        assert_eq!(body["total"], json!(1));
        assert_eq!(body["agents"][0]["agent_id"], json!("transpak_crating_design_agent"));

        let (status, _) = call(&app, request("POST", "/agents/discover", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&app, request("POST", "/agents/discover", Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let query = json!({"skills": ["plan_logistics"]});
        let (status, body) = call(&app, request("POST", "/agents/discover", Some(query))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agents"][0]["agent_id"], json!("transpak_logistics_planner_agent"));

        let (status, body) = call(&app, request("GET", "/agents/nobody", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "error": "Agent not found"}));
    }

    #[tokio::test]
    async fn external_agents_register_and_unregister() {
        let app = app_router(offline_state().await);
        let card = json!({
            "agent_id": "partner_rates",
            "name": "Partner Rates",
            "framework": "crewai",
            "capabilities": [],
            "endpoints": {"message": "http://127.0.0.1:1/a2a"}
        });

        let (status, _) = call(&app, request("POST", "/agents/register", Some(card))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = call(&app, request("GET", "/agents/partner_rates", None)).await;
        assert_eq!(body["agent"]["framework"], json!("external"));

        let (status, _) = call(&app, request("DELETE", &format!("/agents/{SALES}"), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = call(&app, request("DELETE", "/agents/partner_rates", None)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, request("DELETE", "/agents/partner_rates", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn messages_and_skill_queries_report_protocol_errors() {
        let app = app_router(offline_state().await);

        let (status, body) =
            call(&app, request("POST", "/agents/ghost/message", Some(json!({})))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Receiver agent not found"));

        let uri = format!("/agents/{SALES}/skills/teleport/query");
        let (status, body) = call(&app, request("POST", &uri, Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Skill not supported"));
        assert!(body["alternatives"].as_array().is_some_and(|items| !items.is_empty()));

        let uri = format!("/agents/{SALES}/skills/analyze_shipment/query");
        let (status, body) = call(&app, request("POST", &uri, Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Missing required parameter: shipment_data"));
    }

    #[tokio::test]
    async fn execute_workflow_and_negotiate() {
        let app = app_router(offline_state().await);
        let shipment = json!({
            "item_description": "Industrial printer",
            "dimensions": "48x36x24",
            "weight": "350 lbs",
            "origin": "San Jose, CA",
            "destination": "Austin, TX"
        });

        let uri = format!("/agents/{SALES}/execute");
        let (status, _) = call(&app, request("POST", &uri, Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let execute = json!({
            "skill_id": "analyze_shipment",
            "parameters": {"shipment_data": shipment}
        });
        let (status, body) = call(&app, request("POST", &uri, Some(execute))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));

        let (status, _) = call(&app, request("POST", "/workflow/execute", Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let workflow = json!({"shipment_data": shipment});
        let (status, body) = call(&app, request("POST", "/workflow/execute", Some(workflow))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["workflow"]["workflow_id"].is_string());

        let negotiate = json!({"agent_id": SALES, "preferred_modes": ["video", "bogus", "form"]});
        let (status, body) =
            call(&app, request("POST", "/communication/negotiate", Some(negotiate))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["negotiated_mode"], json!("form"));

        let (status, _) =
            call(&app, request("POST", "/communication/negotiate", Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn hosted_validators_execute_and_review_the_workflow() {
        let app = app_router(offline_state().await);
        let shipment = json!({
            "item_description": "Industrial printer",
            "dimensions": "48x36x24",
            "weight": "350 lbs",
            "origin": "San Jose, CA",
            "destination": "Austin, TX"
        });

        let uri = "/agents/external_compliance_checker/execute";
        let execute = json!({"skill_id": "check_regulations", "parameters": shipment});
        let (status, body) = call(&app, request("POST", uri, Some(execute))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["overall_status"], json!("compliant"));

        let query = json!({"sender_id": "tester", "content": {"skill_id": "validate_pricing"}});
        let uri = "/agents/external_pricing_validator/message";
        let (status, _) = call(&app, request("POST", uri, Some(query))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            call(&app, request("DELETE", "/agents/external_pricing_validator", None)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let workflow = json!({"shipment_data": shipment});
        let (status, body) =
            call(&app, request("POST", "/workflow/execute-enhanced", Some(workflow))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["workflow"]["workflow_type"], json!("enhanced_with_external_validation"));
        assert!(body["workflow"]["pricing_validation"]["validation_id"].is_string());
        assert_ne!(body["workflow"]["final_status"], json!("failed"));

        let (status, _) =
            call(&app, request("POST", "/workflow/execute-enhanced", Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_and_ping() {
        let app = app_router(offline_state().await);
        let (_, body) = call(&app, request("GET", "/registry/status", None)).await;
        assert_eq!(body["status"]["total_agents"], json!(6));

        let (status, body) = call(&app, request("GET", "/test/ping", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("A2A protocol is operational"));
        assert_eq!(body["version"], json!("1.0.0"));
    }
}
