use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};

use super::protocol::{A2aProtocol, MessageOutcome, OutgoingMessage};
use super::registry::AgentRegistry;
use super::types::{CommunicationMode, SKILL_QUERY};

const MODE_PRIORITY: [CommunicationMode; 6] = [
    CommunicationMode::Video,
    CommunicationMode::Audio,
    CommunicationMode::Media,
    CommunicationMode::Form,
    CommunicationMode::Json,
    CommunicationMode::Text,
];

pub struct SkillNegotiator {
    registry: Arc<AgentRegistry>,
    protocol: Arc<A2aProtocol>,
}

impl SkillNegotiator {
    pub fn new(registry: Arc<AgentRegistry>, protocol: Arc<A2aProtocol>) -> Self {
        Self { registry, protocol }
    }

    pub async fn query_skill(
        &self,
        requester_id: &str,
        agent_id: &str,
        skill_id: &str,
        parameters: &Map<String, Value>,
    ) -> MessageOutcome {
        let Some(agent) = self.registry.get(agent_id) else {
            return MessageOutcome::failed("Agent not found");
        };

        let Some(capability) = agent.capability(skill_id) else {
            return MessageOutcome {
                alternatives: Some(self.alternatives(skill_id)),
                ..MessageOutcome::failed("Skill not supported")
            };
        };

        let required = capability.required_parameters();
        if let Some(missing) = required.into_iter().find(|name| !parameters.contains_key(*name)) {
            return MessageOutcome::failed(format!("Missing required parameter: {missing}"));
        }

        self.protocol
            .send_message(OutgoingMessage {
                sender_id: requester_id.to_string(),
                receiver_id: agent_id.to_string(),
                message_type: SKILL_QUERY.to_string(),
                content: json!({
                    "skill_id": skill_id,
                    "parameters": parameters,
                    "query_time": Utc::now(),
                }),
                communication_mode: CommunicationMode::Json,
                conversation_id: None,
            })
            .await
    }

    /// Up to three other skill ids, in the order their agents registered.
    fn alternatives(&self, skill_id: &str) -> Vec<String> {
        let mut skills: Vec<String> = Vec::new();
        for card in self.registry.list() {
            for candidate in card.skill_ids() {
                if candidate != skill_id && !skills.iter().any(|seen| seen == candidate) {
                    skills.push(candidate.to_string());
                }
            }
        }
        skills.truncate(3);
        skills
    }

    pub fn negotiate_communication_mode(
        &self,
        agent_id: &str,
        preferred: &[CommunicationMode],
    ) -> CommunicationMode {
        let Some(agent) = self.registry.get(agent_id) else {
            return CommunicationMode::Text;
        };

        let supported: BTreeSet<CommunicationMode> = agent
            .capabilities
            .iter()
            .flat_map(|capability| capability.input_modes.iter().copied())
            .collect();

        MODE_PRIORITY
            .into_iter()
            .find(|mode| preferred.contains(mode) && supported.contains(mode))
            .unwrap_or(CommunicationMode::Text)
    }
}
