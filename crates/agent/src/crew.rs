//! Four-agent crew: each task is one LLM call whose prompt carries the shipment, the
//! outputs of the tasks before it and the deterministic calculator results it needs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use transpak_core::agents::{
    AgentProfile, CRATING_DESIGN, LOGISTICS_PLANNER, QUOTE_CONSOLIDATOR, SALES_BRIEFING,
};
use transpak_core::domain::shipment::ValidatedShipment;
use transpak_core::quote::{cost_block, GeneratedQuote};

use crate::llm::LlmClient;
use crate::tools::{
    shipment_input, ToolRegistry, HANDLING_TOOL, INSURANCE_TOOL, PACKAGING_TOOL, SHIPPING_TOOL,
};

#[derive(Clone, Debug)]
pub struct CrewTask {
    pub agent: &'static AgentProfile,
    pub description: &'static str,
    pub expected_output: &'static str,
    pub tools: &'static [&'static str],
}

pub static CREW_TASKS: [CrewTask; 4] = [
    CrewTask {
        agent: &SALES_BRIEFING,
        description: "Gather and confirm the shipment details. Note dimensions, weight, route, \
                      fragility, special requirements and timeline, and flag anything that \
                      would affect crating or transport.",
        expected_output: "A structured shipment brief",
        tools: &[],
    },
    CrewTask {
        agent: &CRATING_DESIGN,
        description: "Design the crating solution: crate type, materials, cushioning and \
                      labor, using the packaging calculator result.",
        expected_output: "A crating specification with its cost",
        tools: &[PACKAGING_TOOL],
    },
    CrewTask {
        agent: &LOGISTICS_PLANNER,
        description: "Plan the logistics: carrier, route, transit time, insurance and special \
                      handling, using the calculator results.",
        expected_output: "A logistics plan with freight, insurance and handling costs",
        tools: &[SHIPPING_TOOL, INSURANCE_TOOL, HANDLING_TOOL],
    },
    CrewTask {
        agent: &QUOTE_CONSOLIDATOR,
        description: "Consolidate everything into a professional customer quote. Use the \
                      cost breakdown below exactly as given; do not change any amount.",
        expected_output: "The final customer-facing quote document",
        tools: &[],
    },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskOutput {
    pub agent: &'static str,
    pub output: String,
    pub duration: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrewOutput {
    pub tasks: Vec<TaskOutput>,
    pub narrative: String,
}

pub struct QuoteCrew {
    client: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
}

impl QuoteCrew {
    pub fn new(client: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        Self { client, tools }
    }

    /// Runs the tasks in order. The first failing call aborts the crew.
    pub async fn kickoff(
        &self,
        shipment: &ValidatedShipment,
        generated: &GeneratedQuote,
    ) -> Result<CrewOutput> {
        let input = shipment_input(shipment);
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(CREW_TASKS.len());

        for task in &CREW_TASKS {
            let mut tool_results = Vec::with_capacity(task.tools.len());
            for tool in task.tools {
                tool_results.push((*tool, self.tools.execute(tool, input.clone()).await?));
            }

            let prompt = task_prompt(task, shipment, generated, &outputs, &tool_results);
            let started = Instant::now();
            let output = self
                .client
                .complete(&prompt)
                .await
                .with_context(|| format!("{} task failed", task.agent.name))?;
            debug!(
                event_name = "agent.crew.task_completed",
                agent_id = task.agent.name,
                output_chars = output.len(),
                "crew task completed"
            );

            outputs.push(TaskOutput {
                agent: task.agent.name,
                output,
                duration: started.elapsed(),
            });
        }

        let narrative = outputs.last().map(|task| task.output.clone()).unwrap_or_default();
        Ok(CrewOutput { tasks: outputs, narrative })
    }
}

pub fn task_prompt(
    task: &CrewTask,
    shipment: &ValidatedShipment,
    generated: &GeneratedQuote,
    previous: &[TaskOutput],
    tool_results: &[(&str, Value)],
) -> String {
    let profile = task.agent;
    let mut sections = vec![
        format!("You are the {}.", profile.role),
        format!("Goal: {}", profile.goal),
        format!("Background: {}", profile.backstory),
        String::new(),
        format!("TASK: {}", task.description),
        format!("Expected output: {}", task.expected_output),
        String::new(),
        "SHIPMENT:".to_string(),
        format!("Item: {}", shipment.item_description),
        format!("Dimensions: {} inches", shipment.dimensions),
        format!("Weight: {}", shipment.weight),
        format!("Origin: {}", shipment.origin),
        format!("Destination: {}", shipment.destination),
        format!("Fragility: {}", shipment.fragility),
        format!("Special requirements: {}", or_none(&shipment.special_requirements)),
        format!("Timeline: {}", or_none(&shipment.timeline)),
    ];

    for (name, result) in tool_results {
        sections.push(String::new());
        sections.push(format!("TOOL {name}:"));
        sections.push(result.to_string());
    }

    for earlier in previous {
        sections.push(String::new());
        sections.push(format!("{} OUTPUT:", earlier.agent.to_uppercase()));
        sections.push(earlier.output.clone());
    }

    if profile.name == QUOTE_CONSOLIDATOR.name {
        sections.push(String::new());
        sections.push(format!("Quote Reference: {}", generated.reference));
        sections.push(cost_block(&generated.cost_breakdown));
    }

    sections.join("\n")
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        "None"
    } else {
        value
    }
}
