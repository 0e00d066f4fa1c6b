use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::adapters::{SkillExecution, TransPakAgents};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logistics: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    pub workflow_id: String,
    pub success: bool,
    pub results: WorkflowResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// analyze_shipment -> design_packaging -> plan_logistics -> consolidate_quote.
pub struct CrossFrameworkWorkflow<'a> {
    agents: &'a TransPakAgents,
}

impl<'a> CrossFrameworkWorkflow<'a> {
    pub fn new(agents: &'a TransPakAgents) -> Self {
        Self { agents }
    }

    pub fn execute(&self, shipment_data: &Value) -> WorkflowOutcome {
        let mut outcome = WorkflowOutcome {
            workflow_id: Uuid::new_v4().to_string(),
            success: false,
            results: WorkflowResults::default(),
            failed_step: None,
            error: None,
        };

        let analysis = self.agents.sales_briefing().execute_skill(
            "analyze_shipment",
            &json!({ "shipment_data": shipment_data }),
        );
        let Some(analysis) = step(&mut outcome, "analyze_shipment", analysis) else {
            return outcome;
        };
        outcome.results.analysis = Some(analysis.clone());

        let packaging = self.agents.crating_design().execute_skill(
            "design_packaging",
            &json!({ "shipment_data": shipment_data, "analysis_result": analysis }),
        );
        let Some(packaging) = step(&mut outcome, "design_packaging", packaging) else {
            return outcome;
        };
        outcome.results.packaging = Some(packaging.clone());

        let logistics = self.agents.logistics_planner().execute_skill(
            "plan_logistics",
            &json!({ "shipment_data": shipment_data, "packaging_result": packaging }),
        );
        let Some(logistics) = step(&mut outcome, "plan_logistics", logistics) else {
            return outcome;
        };
        outcome.results.logistics = Some(logistics.clone());

        let quote = self.agents.quote_consolidator().execute_skill(
            "consolidate_quote",
            &json!({
                "analysis_result": analysis,
                "packaging_result": packaging,
                "logistics_result": logistics,
            }),
        );
        let Some(quote) = step(&mut outcome, "consolidate_quote", quote) else {
            return outcome;
        };
        outcome.results.quote = Some(quote);
        outcome.success = true;

        info!(
            event_name = "a2a.workflow.completed",
            workflow_id = %outcome.workflow_id,
            "cross-framework workflow completed"
        );
        outcome
    }
}

fn step(outcome: &mut WorkflowOutcome, name: &str, execution: SkillExecution) -> Option<Value> {
    match execution.result {
        Some(result) if execution.success => Some(result),
        _ => {
            outcome.failed_step = Some(name.to_string());
            outcome.error =
                Some(execution.error.unwrap_or_else(|| format!("{name} returned no result")));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use super::CrossFrameworkWorkflow;
    use crate::a2a::adapters::TransPakAgents;

    fn decimal(value: &Value) -> Decimal {
        value.as_str().and_then(|text| text.parse().ok()).unwrap_or_default()
    }

    #[test]
    fn workflow_chains_all_four_agents() {
        let agents = TransPakAgents::new();
        let outcome = CrossFrameworkWorkflow::new(&agents).execute(&json!({
            "item_description": "Industrial printer",
            "dimensions": "48x36x24",
            "weight": "350 lbs",
            "origin": "San Jose, CA",
            "destination": "Austin, TX",
        }));

        assert!(outcome.success, "workflow failed: {:?}", outcome.error);
        let quote = outcome.results.quote.expect("quote");
        assert_eq!(decimal(&quote["total_cost"]), Decimal::new(313467, 2));
        assert_eq!(quote["validity_period"], json!("30 days"));
        let confidence = quote["confidence_rating"].as_f64().unwrap_or_default();
        assert!((confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn workflow_stops_at_first_failing_step() {
        let agents = TransPakAgents::new();
        let outcome = CrossFrameworkWorkflow::new(&agents)
            .execute(&json!({"item_description": "Lamp", "weight": "10"}));

        assert!(!outcome.success);
        assert_eq!(outcome.failed_step.as_deref(), Some("design_packaging"));
        assert!(outcome.results.analysis.is_some());
        assert!(outcome.results.logistics.is_none());
    }
}
