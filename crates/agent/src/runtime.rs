use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use transpak_core::cache::{shipment_fingerprint, AgentMetrics, CachedNarrative, QuoteCache};
use transpak_core::domain::shipment::ValidatedShipment;
use transpak_core::quote::{cost_block, GeneratedQuote};

use crate::crew::QuoteCrew;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::LlmClient;
use crate::tools::ToolRegistry;

pub const CREW_METRIC: &str = "quote_crew";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    /// No LLM configured; the narrative is the generated quote document.
    Deterministic,
    Llm,
    Cached,
    /// The crew failed or its output was rejected.
    Fallback,
}

impl NarrativeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Llm => "llm",
            Self::Cached => "cached",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Narration {
    pub content: String,
    pub source: NarrativeSource,
    pub guardrail: Option<&'static str>,
}

impl Narration {
    fn deterministic(generated: &GeneratedQuote, source: NarrativeSource) -> Self {
        Self { content: generated.quote_content.clone(), source, guardrail: None }
    }
}

/// Produces the customer-facing narrative for a generated quote.
pub struct AgentRuntime {
    client: Option<Arc<dyn LlmClient>>,
    tools: Arc<ToolRegistry>,
    guardrails: GuardrailPolicy,
    cache: Arc<QuoteCache>,
    metrics: Arc<AgentMetrics>,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new(None, Arc::new(QuoteCache::default()), Arc::new(AgentMetrics::new()))
    }
}

impl AgentRuntime {
    pub fn new(
        client: Option<Arc<dyn LlmClient>>,
        cache: Arc<QuoteCache>,
        metrics: Arc<AgentMetrics>,
    ) -> Self {
        Self {
            client,
            tools: Arc::new(ToolRegistry::pricing()),
            guardrails: GuardrailPolicy::default(),
            cache,
            metrics,
        }
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn llm_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn metrics(&self) -> &Arc<AgentMetrics> {
        &self.metrics
    }

    pub async fn narrate(
        &self,
        shipment: &ValidatedShipment,
        generated: &GeneratedQuote,
    ) -> Narration {
        let Some(client) = self.client.as_ref() else {
            return Narration::deterministic(generated, NarrativeSource::Deterministic);
        };

        let key = shipment_fingerprint(shipment);
        if let Some(cached) = self.cache.get(&key) {
            info!(
                event_name = "agent.narrative.cache_hit",
                quote_reference = %generated.reference,
                model = %cached.model,
                "reusing cached narrative"
            );
            return self.guard(cached.narrative, NarrativeSource::Cached, generated);
        }

        let crew = QuoteCrew::new(Arc::clone(client), Arc::clone(&self.tools));
        let started = Instant::now();
        let outcome = crew.kickoff(shipment, generated).await;
        self.metrics.record(CREW_METRIC, started.elapsed(), outcome.is_ok());

        match outcome {
            Ok(output) => {
                for task in &output.tasks {
                    self.metrics.record(task.agent, task.duration, true);
                }
                let narration = self.guard(output.narrative, NarrativeSource::Llm, generated);
                // Only narratives that passed the guardrail untouched are reused.
                if narration.source == NarrativeSource::Llm && narration.guardrail.is_none() {
                    self.cache.put(
                        key,
                        CachedNarrative {
                            narrative: narration.content.clone(),
                            model: client.model().to_string(),
                        },
                    );
                }
                narration
            }
            Err(error) => {
                warn!(
                    event_name = "agent.narrative.fallback",
                    quote_reference = %generated.reference,
                    error = %format!("{error:#}"),
                    "crew failed; using deterministic quote"
                );
                Narration::deterministic(generated, NarrativeSource::Fallback)
            }
        }
    }

    fn guard(
        &self,
        narrative: String,
        source: NarrativeSource,
        generated: &GeneratedQuote,
    ) -> Narration {
        match self.guardrails.evaluate(&narrative, &generated.cost_breakdown) {
            GuardrailDecision::Allow => Narration { content: narrative, source, guardrail: None },
            GuardrailDecision::Degrade { reason_code, .. } => {
                info!(
                    event_name = "agent.guardrail.degrade",
                    quote_reference = %generated.reference,
                    reason_code,
                    "appending deterministic cost breakdown"
                );
                let content = format!(
                    "{}\n\n{}",
                    narrative.trim_end(),
                    cost_block(&generated.cost_breakdown)
                );
                Narration { content, source, guardrail: Some(reason_code) }
            }
            GuardrailDecision::Deny { reason_code, .. } => {
                warn!(
                    event_name = "agent.guardrail.deny",
                    quote_reference = %generated.reference,
                    reason_code,
                    "narrative rejected"
                );
                Narration {
                    guardrail: Some(reason_code),
                    ..Narration::deterministic(generated, NarrativeSource::Fallback)
                }
            }
        }
    }
}
