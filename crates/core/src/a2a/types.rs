use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentFramework {
    Crewai,
    Langchain,
    Autogen,
    Custom,
    External,
}

impl AgentFramework {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crewai => "crewai",
            Self::Langchain => "langchain",
            Self::Autogen => "autogen",
            Self::Custom => "custom",
            Self::External => "external",
        }
    }
}

impl fmt::Display for AgentFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationMode {
    Text,
    Json,
    Form,
    Media,
    Audio,
    Video,
    File,
}

impl CommunicationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Form => "form",
            Self::Media => "media",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::File => "file",
        }
    }
}

impl FromStr for CommunicationMode {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "form" => Ok(Self::Form),
            "media" => Ok(Self::Media),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "file" => Ok(Self::File),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown communication mode `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Analysis,
    Generation,
    Processing,
    Validation,
    Integration,
    Communication,
}

fn default_modes() -> Vec<CommunicationMode> {
    vec![CommunicationMode::Text, CommunicationMode::Json]
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_status() -> String {
    "active".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentCapability {
    pub skill_id: String,
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    #[serde(default = "default_modes")]
    pub input_modes: Vec<CommunicationMode>,
    #[serde(default = "default_modes")]
    pub output_modes: Vec<CommunicationMode>,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default = "default_version")]
    pub version: String,
}

impl AgentCapability {
    /// Names listed under `parameters.required`.
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub framework: AgentFramework,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<AgentCapability>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
    #[serde(default)]
    pub auth_schemes: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl AgentCard {
    pub fn supports_skill(&self, skill_id: &str) -> bool {
        self.capability(skill_id).is_some()
    }

    pub fn capability(&self, skill_id: &str) -> Option<&AgentCapability> {
        self.capabilities.iter().find(|capability| capability.skill_id == skill_id)
    }

    pub fn skill_ids(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(|capability| capability.skill_id.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    /// External agents hosted by this process answer without a transport.
    pub fn is_in_process(&self) -> bool {
        self.metadata.get(HOSTING_KEY).and_then(Value::as_str) == Some(IN_PROCESS_HOSTING)
    }
}

pub const HOSTING_KEY: &str = "hosting";
pub const IN_PROCESS_HOSTING: &str = "in_process";

pub const SKILL_QUERY: &str = "skill_query";
pub const TASK_REQUEST: &str = "task_request";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct A2aMessage {
    pub message_id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message_type: String,
    pub content: Value,
    pub communication_mode: CommunicationMode,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

impl A2aMessage {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        message_type: impl Into<String>,
        content: Value,
        communication_mode: CommunicationMode,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            message_type: message_type.into(),
            content,
            communication_mode,
            timestamp: Utc::now(),
            status: "sent".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AgentCard, AgentFramework, CommunicationMode};

    #[test]
    fn card_defaults_fill_optional_fields() {
        let card: AgentCard = serde_json::from_value(json!({
            "agent_id": "partner_rates",
            "name": "Partner Rates",
            "framework": "external",
            "capabilities": [{
                "skill_id": "rate_lookup",
                "name": "Rate Lookup",
                "description": "Looks up partner freight rates",
                "category": "integration",
                "parameters": {"required": ["origin", "destination"]}
            }]
        }))
        .expect("card parses");

        assert_eq!(card.framework, AgentFramework::External);
        assert_eq!(card.status, "active");
        assert_eq!(card.version, "1.0");
        let capability = card.capability("rate_lookup").expect("capability");
        assert_eq!(capability.input_modes, vec![CommunicationMode::Text, CommunicationMode::Json]);
        assert_eq!(capability.required_parameters(), vec!["origin", "destination"]);
    }

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("VIDEO".parse::<CommunicationMode>(), Ok(CommunicationMode::Video));
        assert!("smoke-signal".parse::<CommunicationMode>().is_err());
    }
}
