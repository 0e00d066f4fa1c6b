use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::types::{AgentCard, AgentFramework};

/// Filter accepted by [`AgentRegistry::query_capabilities`]. Absent keys match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityQuery {
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub communication_modes: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub total_agents: usize,
    pub active_agents: usize,
    pub total_skills: usize,
    pub framework_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
struct RegistryState {
    agents: Vec<AgentCard>,
    skill_index: BTreeMap<String, Vec<String>>,
}

impl RegistryState {
    fn drop_index_entries(&mut self, agent_id: &str) {
        self.skill_index.retain(|_, agents| {
            agents.retain(|id| id != agent_id);
            !agents.is_empty()
        });
    }
}

/// Shared directory of agent cards with a skill index.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    state: RwLock<RegistryState>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, card: AgentCard) {
        let agent_id = card.agent_id.clone();
        let skills: Vec<String> = card.skill_ids().map(str::to_string).collect();

        let mut state = self.write();
        state.drop_index_entries(&agent_id);
        for skill in &skills {
            let agents = state.skill_index.entry(skill.clone()).or_default();
            if !agents.contains(&agent_id) {
                agents.push(agent_id.clone());
            }
        }
        match state.agents.iter().position(|existing| existing.agent_id == agent_id) {
            Some(index) => state.agents[index] = card,
            None => state.agents.push(card),
        }
        drop(state);

        info!(
            event_name = "a2a.agent.registered",
            agent_id = %agent_id,
            skills = skills.len(),
            "agent registered"
        );
    }

    pub fn unregister(&self, agent_id: &str) -> Option<AgentCard> {
        let mut state = self.write();
        let position = state.agents.iter().position(|card| card.agent_id == agent_id)?;
        let removed = state.agents.remove(position);
        state.drop_index_entries(agent_id);
        drop(state);

        info!(event_name = "a2a.agent.unregistered", agent_id = %agent_id, "agent unregistered");
        Some(removed)
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentCard> {
        self.read().agents.iter().find(|card| card.agent_id == agent_id).cloned()
    }

    pub fn list(&self) -> Vec<AgentCard> {
        self.read().agents.clone()
    }

    pub fn discover_by_skill(&self, skill_id: &str) -> Vec<AgentCard> {
        let state = self.read();
        let Some(agent_ids) = state.skill_index.get(skill_id) else {
            return Vec::new();
        };
        state.agents.iter().filter(|card| agent_ids.contains(&card.agent_id)).cloned().collect()
    }

    pub fn discover_by_framework(&self, framework: AgentFramework) -> Vec<AgentCard> {
        self.read().agents.iter().filter(|card| card.framework == framework).cloned().collect()
    }

    pub fn query_capabilities(&self, query: &CapabilityQuery) -> Vec<AgentCard> {
        self.read().agents.iter().filter(|card| matches_query(card, query)).cloned().collect()
    }

    pub fn status(&self) -> RegistryStatus {
        let state = self.read();
        let mut framework_distribution = BTreeMap::new();
        for card in &state.agents {
            *framework_distribution.entry(card.framework.as_str().to_string()).or_insert(0) += 1;
        }

        RegistryStatus {
            total_agents: state.agents.len(),
            active_agents: state.agents.iter().filter(|card| card.is_active()).count(),
            total_skills: state.skill_index.len(),
            framework_distribution,
        }
    }

    #[cfg(test)]
    fn indexed_agents(&self, skill_id: &str) -> Vec<String> {
        self.read().skill_index.get(skill_id).cloned().unwrap_or_default()
    }
}

fn matches_query(card: &AgentCard, query: &CapabilityQuery) -> bool {
    if let Some(framework) = &query.framework {
        if !card.framework.as_str().eq_ignore_ascii_case(framework) {
            return false;
        }
    }

    if let Some(skills) = &query.skills {
        if !skills.iter().all(|skill| card.supports_skill(skill)) {
            return false;
        }
    }

    if let Some(modes) = &query.communication_modes {
        let supported = modes.iter().all(|mode| {
            card.capabilities.iter().any(|capability| {
                capability.input_modes.iter().any(|input| input.as_str().eq_ignore_ascii_case(mode))
            })
        });
        if !supported {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use super::{AgentRegistry, CapabilityQuery};
    use crate::a2a::types::{
        AgentCapability, AgentCard, AgentFramework, CommunicationMode, SkillCategory,
    };

    fn capability(skill_id: &str, modes: Vec<CommunicationMode>) -> AgentCapability {
        AgentCapability {
            skill_id: skill_id.to_string(),
            name: skill_id.to_string(),
            description: String::new(),
            category: SkillCategory::Analysis,
            input_modes: modes.clone(),
            output_modes: modes,
            parameters: json!({}),
            version: "1.0".to_string(),
        }
    }

    fn card(agent_id: &str, framework: AgentFramework, skills: &[&str]) -> AgentCard {
        AgentCard {
            agent_id: agent_id.to_string(),
            name: agent_id.to_string(),
            description: String::new(),
            framework,
            version: "1.0.0".to_string(),
            capabilities: skills
                .iter()
                .map(|skill| {
                    capability(skill, vec![CommunicationMode::Json, CommunicationMode::Text])
                })
                .collect(),
            endpoints: BTreeMap::new(),
            auth_schemes: Vec::new(),
            metadata: BTreeMap::new(),
            status: "active".to_string(),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn reregistration_keeps_skill_index_free_of_duplicates() {
        let registry = AgentRegistry::new();
        registry.register(card("a", AgentFramework::Crewai, &["analyze", "plan"]));
        registry.register(card("a", AgentFramework::Crewai, &["analyze"]));
        registry.register(card("b", AgentFramework::External, &["analyze"]));

        assert_eq!(registry.indexed_agents("analyze"), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.indexed_agents("plan").is_empty());
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn discover_by_skill_returns_exact_advertisers_in_order() {
        let registry = AgentRegistry::new();
        registry.register(card("first", AgentFramework::Crewai, &["route"]));
        registry.register(card("second", AgentFramework::Crewai, &["pack"]));
        registry.register(card("third", AgentFramework::External, &["route", "pack"]));

        let ids: Vec<String> =
            registry.discover_by_skill("route").into_iter().map(|card| card.agent_id).collect();
        assert_eq!(ids, vec!["first".to_string(), "third".to_string()]);
        assert!(registry.discover_by_skill("missing").is_empty());
        assert_eq!(registry.discover_by_framework(AgentFramework::External).len(), 1);
    }

    #[test]
    fn capability_query_requires_every_present_key() {
        let registry = AgentRegistry::new();
        let mut media = card("media", AgentFramework::Crewai, &["design"]);
        media.capabilities[0].input_modes.push(CommunicationMode::Media);
        registry.register(media);
        registry.register(card("plain", AgentFramework::Crewai, &["design", "plan"]));

        let by_mode = registry.query_capabilities(&CapabilityQuery {
            communication_modes: Some(vec!["media".to_string()]),
            ..CapabilityQuery::default()
        });
        assert_eq!(by_mode.len(), 1);
        assert_eq!(by_mode[0].agent_id, "media");

        let by_skills = registry.query_capabilities(&CapabilityQuery {
            framework: Some("crewai".to_string()),
            skills: Some(vec!["design".to_string(), "plan".to_string()]),
            communication_modes: None,
        });
        assert_eq!(by_skills.len(), 1);
        assert_eq!(by_skills[0].agent_id, "plain");
    }

    #[test]
    fn unregister_clears_index_and_status_counts() {
        let registry = Arc::new(AgentRegistry::new());
        registry.register(card("a", AgentFramework::Crewai, &["x", "y"]));
        registry.register(card("b", AgentFramework::External, &["y"]));

        let status = registry.status();
        assert_eq!(status.total_agents, 2);
        assert_eq!(status.total_skills, 2);
        assert_eq!(status.framework_distribution.get("crewai"), Some(&1));

        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        let status = registry.status();
        assert_eq!(status.total_agents, 1);
        assert_eq!(status.total_skills, 1);
        assert!(registry.get("a").is_none());
    }
}
