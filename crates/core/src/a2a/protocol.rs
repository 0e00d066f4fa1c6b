use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::registry::AgentRegistry;
use super::types::{A2aMessage, AgentCard, AgentFramework, CommunicationMode};
use super::types::{SKILL_QUERY, TASK_REQUEST};

pub const MESSAGE_LOG_CAPACITY: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Body(String),
}

/// Outbound channel to agents that live outside this process.
#[async_trait]
pub trait ExternalTransport: Send + Sync {
    async fn deliver(
        &self,
        endpoint: &str,
        bearer: Option<&SecretString>,
        message: &A2aMessage,
    ) -> Result<Value, TransportError>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
}

impl MessageOutcome {
    pub fn delivered(message: &A2aMessage, response: Value) -> Self {
        Self {
            success: true,
            message_id: Some(message.message_id.clone()),
            conversation_id: Some(message.conversation_id.clone()),
            status: Some("delivered".to_string()),
            response: Some(response),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Self::default() }
    }
}

pub struct OutgoingMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub message_type: String,
    pub content: Value,
    pub communication_mode: CommunicationMode,
    pub conversation_id: Option<String>,
}

/// Routes messages to registered agents and keeps a bounded log of what was sent.
pub struct A2aProtocol {
    registry: Arc<AgentRegistry>,
    transport: Option<Arc<dyn ExternalTransport>>,
    log: Mutex<VecDeque<A2aMessage>>,
}

impl A2aProtocol {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry, transport: None, log: Mutex::new(VecDeque::new()) }
    }

    pub fn with_transport(mut self, transport: Arc<dyn ExternalTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub async fn send_message(&self, outgoing: OutgoingMessage) -> MessageOutcome {
        let message = A2aMessage::new(
            outgoing.sender_id,
            outgoing.receiver_id,
            outgoing.message_type,
            outgoing.content,
            outgoing.communication_mode,
            outgoing.conversation_id,
        );
        self.append_log(message.clone());

        let Some(receiver) = self.registry.get(&message.receiver_id) else {
            return MessageOutcome::failed("Receiver agent not found");
        };

        let outcome = match receiver.framework {
            AgentFramework::Crewai => deliver_locally(&message, &receiver),
            AgentFramework::External if receiver.is_in_process() => {
                deliver_locally(&message, &receiver)
            }
            AgentFramework::External => self.deliver_externally(&message, &receiver).await,
            _ => MessageOutcome::failed("Framework not yet supported"),
        };

        if outcome.success {
            info!(
                event_name = "a2a.message.delivered",
                message_id = %message.message_id,
                agent_id = %receiver.agent_id,
                message_type = %message.message_type,
                "a2a message delivered"
            );
        } else {
            warn!(
                event_name = "a2a.message.failed",
                message_id = %message.message_id,
                agent_id = %receiver.agent_id,
                error = outcome.error.as_deref().unwrap_or_default(),
                "a2a message failed"
            );
        }
        outcome
    }

    async fn deliver_externally(
        &self,
        message: &A2aMessage,
        receiver: &AgentCard,
    ) -> MessageOutcome {
        let Some(endpoint) =
            receiver.endpoints.get("message").or_else(|| receiver.endpoints.get("default"))
        else {
            return MessageOutcome::failed("External agent has no message endpoint");
        };
        let Some(transport) = self.transport.as_ref() else {
            return MessageOutcome::failed("External transport is not configured");
        };

        let bearer = receiver
            .metadata
            .get("auth_token")
            .and_then(Value::as_str)
            .map(|token| SecretString::from(token.to_string()));

        match transport.deliver(endpoint, bearer.as_ref(), message).await {
            Ok(body) => MessageOutcome::delivered(message, body),
            Err(error) => MessageOutcome::failed(error.to_string()),
        }
    }

    fn append_log(&self, message: A2aMessage) {
        let mut log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if log.len() == MESSAGE_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(message);
    }

    /// Most recent messages, newest last.
    pub fn recent_messages(&self, limit: usize) -> Vec<A2aMessage> {
        let log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let skip = log.len().saturating_sub(limit);
        log.iter().skip(skip).cloned().collect()
    }

    pub fn conversation(&self, conversation_id: &str) -> Vec<A2aMessage> {
        let log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        log.iter().filter(|message| message.conversation_id == conversation_id).cloned().collect()
    }
}

fn deliver_locally(message: &A2aMessage, receiver: &AgentCard) -> MessageOutcome {
    match message.message_type.as_str() {
        SKILL_QUERY => {
            let skill_id = message.content.get("skill_id").and_then(Value::as_str).unwrap_or("");
            let response = match receiver.capability(skill_id) {
                Some(capability) => json!({
                    "available": true,
                    "capability": capability,
                    "estimated_time": "30-60 seconds",
                    "cost_estimate": "varies",
                }),
                None => json!({
                    "available": false,
                    "alternative_skills": receiver.skill_ids().take(3).collect::<Vec<_>>(),
                }),
            };
            MessageOutcome::delivered(message, response)
        }
        TASK_REQUEST => MessageOutcome::delivered(
            message,
            json!({
                "task_accepted": true,
                "estimated_completion": Utc::now() + Duration::minutes(2),
                "tracking_id": Uuid::new_v4().to_string(),
            }),
        ),
        other => MessageOutcome::failed(format!("Unknown message type: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::{json, Value};

    use super::{A2aProtocol, ExternalTransport, OutgoingMessage, TransportError};
    use crate::a2a::registry::AgentRegistry;
    use crate::a2a::types::{
        A2aMessage, AgentCapability, AgentCard, AgentFramework, CommunicationMode, SkillCategory,
        HOSTING_KEY, IN_PROCESS_HOSTING,
    };

    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<(String, Option<String>)>>,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl ExternalTransport for RecordingTransport {
        async fn deliver(
            &self,
            endpoint: &str,
            bearer: Option<&SecretString>,
            _message: &A2aMessage,
        ) -> Result<Value, TransportError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((
                    endpoint.to_string(),
                    bearer.map(|token| token.expose_secret().to_string()),
                ));
            }
            match self.fail_with {
                Some(status) => Err(TransportError::Status(status)),
                None => Ok(json!({"ack": true})),
            }
        }
    }

    fn card(agent_id: &str, framework: AgentFramework) -> AgentCard {
        AgentCard {
            agent_id: agent_id.to_string(),
            name: agent_id.to_string(),
            description: String::new(),
            framework,
            version: "1.0.0".to_string(),
            capabilities: ["alpha", "beta", "gamma", "delta"]
                .iter()
                .map(|skill| AgentCapability {
                    skill_id: skill.to_string(),
                    name: skill.to_string(),
                    description: String::new(),
                    category: SkillCategory::Processing,
                    input_modes: vec![CommunicationMode::Json],
                    output_modes: vec![CommunicationMode::Json],
                    parameters: json!({}),
                    version: "1.0".to_string(),
                })
                .collect(),
            endpoints: BTreeMap::new(),
            auth_schemes: vec!["bearer".to_string()],
            metadata: BTreeMap::new(),
            status: "active".to_string(),
            last_updated: Utc::now(),
        }
    }

    fn outgoing(receiver: &str, message_type: &str, content: Value) -> OutgoingMessage {
        OutgoingMessage {
            sender_id: "tester".to_string(),
            receiver_id: receiver.to_string(),
            message_type: message_type.to_string(),
            content,
            communication_mode: CommunicationMode::Json,
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn unknown_receiver_and_framework_errors_use_exact_strings() {
        let registry = Arc::new(AgentRegistry::new());
        registry.register(card("lc", AgentFramework::Langchain));
        let protocol = A2aProtocol::new(registry);

        let missing = protocol.send_message(outgoing("nobody", "task_request", json!({}))).await;
        assert_eq!(missing.error.as_deref(), Some("Receiver agent not found"));

        let unsupported = protocol.send_message(outgoing("lc", "task_request", json!({}))).await;
        assert_eq!(unsupported.error.as_deref(), Some("Framework not yet supported"));
    }

    #[tokio::test]
    async fn local_delivery_answers_skill_queries_and_tasks() {
        let registry = Arc::new(AgentRegistry::new());
        registry.register(card("local", AgentFramework::Crewai));
        let protocol = A2aProtocol::new(registry);

        let found = protocol
            .send_message(outgoing("local", "skill_query", json!({"skill_id": "beta"})))
            .await;
        assert!(found.success);
        assert_eq!(found.status.as_deref(), Some("delivered"));
        let response = found.response.expect("response");
        assert_eq!(response["available"], json!(true));
        assert_eq!(response["estimated_time"], json!("30-60 seconds"));

        let missing = protocol
            .send_message(outgoing("local", "skill_query", json!({"skill_id": "omega"})))
            .await;
        let response = missing.response.expect("response");
        assert_eq!(response["alternative_skills"], json!(["alpha", "beta", "gamma"]));

        let task = protocol.send_message(outgoing("local", "task_request", json!({}))).await;
        assert_eq!(task.response.expect("response")["task_accepted"], json!(true));

        let unknown = protocol.send_message(outgoing("local", "gossip", json!({}))).await;
        assert_eq!(unknown.error.as_deref(), Some("Unknown message type: gossip"));
    }

    #[tokio::test]
    async fn external_delivery_uses_endpoint_and_bearer_token() {
        let registry = Arc::new(AgentRegistry::new());
        let mut external = card("partner", AgentFramework::External);
        external.endpoints.insert("default".to_string(), "http://partner/a2a".to_string());
        external.metadata.insert("auth_token".to_string(), json!("secret-token"));
        registry.register(external);
        registry.register(card("bare", AgentFramework::External));

        let transport = Arc::new(RecordingTransport::default());
        let protocol = A2aProtocol::new(registry).with_transport(transport.clone());

        let outcome = protocol.send_message(outgoing("partner", "task_request", json!({}))).await;
        assert!(outcome.success);
        assert_eq!(outcome.response, Some(json!({"ack": true})));
        let calls = transport.calls.lock().expect("lock").clone();
        assert_eq!(
            calls,
            vec![("http://partner/a2a".to_string(), Some("secret-token".to_string()))]
        );

        let no_endpoint = protocol.send_message(outgoing("bare", "task_request", json!({}))).await;
        assert_eq!(no_endpoint.error.as_deref(), Some("External agent has no message endpoint"));
    }

    #[tokio::test]
    async fn external_failures_are_reported() {
        let registry = Arc::new(AgentRegistry::new());
        let mut external = card("partner", AgentFramework::External);
        external.endpoints.insert("message".to_string(), "http://partner/msg".to_string());
        registry.register(external);

        let transport = Arc::new(RecordingTransport { fail_with: Some(502), ..Default::default() });
        let protocol = A2aProtocol::new(registry).with_transport(transport);

        let outcome = protocol.send_message(outgoing("partner", "task_request", json!({}))).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("HTTP 502"));
    }

    #[tokio::test]
    async fn in_process_external_agents_skip_the_transport() {
        let registry = Arc::new(AgentRegistry::new());
        let mut hosted = card("validator", AgentFramework::External);
        hosted.metadata.insert(HOSTING_KEY.to_string(), json!(IN_PROCESS_HOSTING));
        registry.register(hosted);

        let transport = Arc::new(RecordingTransport::default());
        let protocol = A2aProtocol::new(registry).with_transport(transport.clone());
        let query = outgoing("validator", "skill_query", json!({"skill_id": "beta"}));

        let outcome = protocol.send_message(query).await;
        assert!(outcome.success);
        assert_eq!(outcome.response.expect("response")["available"], json!(true));
        assert!(transport.calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn message_log_is_bounded() {
        let registry = Arc::new(AgentRegistry::new());
        let protocol = A2aProtocol::new(registry);
        for _ in 0..(super::MESSAGE_LOG_CAPACITY + 25) {
            protocol.send_message(outgoing("nobody", "task_request", json!({}))).await;
        }

        assert_eq!(protocol.recent_messages(usize::MAX).len(), super::MESSAGE_LOG_CAPACITY);
        assert_eq!(protocol.recent_messages(3).len(), 3);
    }
}
