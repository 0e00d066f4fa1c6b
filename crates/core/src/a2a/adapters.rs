//! The four TransPak agents exposed as A2A participants.
//!
//! Skills run in-process against the pricing engine, so a remote caller gets the same
//! numbers as the web flow.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::registry::AgentRegistry;
use super::types::{AgentCapability, AgentCard, AgentFramework, CommunicationMode, SkillCategory};
use crate::agents::{
    AgentProfile, CRATING_DESIGN, LOGISTICS_PLANNER, QUOTE_CONSOLIDATOR, SALES_BRIEFING,
};
use crate::domain::shipment::{ShipmentRequest, ValidatedShipment};
use crate::pricing::calculators::{
    enhanced_packaging_cost, enhanced_shipping_rate, insurance_cost, special_handling_cost,
};
use crate::pricing::location::{distance_factor, regional_fuel_rate, route_estimate};
use crate::pricing::market::MarketSnapshot;
use crate::pricing::format_usd;

const PACKAGING_MATERIALS: [&str; 4] =
    ["plywood", "foam_padding", "moisture_barrier", "corner_protectors"];

const QUOTE_TERMS: [&str; 5] = [
    "Quote valid for 30 days from issue date",
    "Payment terms: Net 30 days",
    "Insurance coverage included up to declared value",
    "Customer responsible for accurate item description",
    "Delivery times are estimates and not guaranteed",
];

const SHIPMENT_FIELDS: [&str; 9] = [
    "item_description",
    "dimensions",
    "weight",
    "origin",
    "destination",
    "fragility",
    "special_requirements",
    "timeline",
    "declared_value",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillExecution {
    pub success: bool,
    pub agent_id: String,
    pub skill_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SkillExecution {
    pub(crate) fn settle(agent_id: &str, skill_id: &str, outcome: Result<Value, String>) -> Self {
        let (result, error) = match outcome {
            Ok(result) => {
                info!(
                    event_name = "a2a.skill.executed",
                    agent_id = %agent_id,
                    skill_id = %skill_id,
                    "skill executed"
                );
                (Some(result), None)
            }
            Err(error) => {
                warn!(
                    event_name = "a2a.skill.failed",
                    agent_id = %agent_id,
                    skill_id = %skill_id,
                    error = %error,
                    "skill execution failed"
                );
                (None, Some(error))
            }
        };
        Self {
            success: error.is_none(),
            agent_id: agent_id.to_string(),
            skill_id: skill_id.to_string(),
            result,
            error,
            timestamp: Utc::now(),
        }
    }
}

pub struct TransPakAgentAdapter {
    profile: &'static AgentProfile,
    agent_id: String,
    capabilities: Vec<AgentCapability>,
}

impl TransPakAgentAdapter {
    fn new(profile: &'static AgentProfile, capabilities: Vec<AgentCapability>) -> Self {
        Self { agent_id: agent_id_for(profile.name), profile, capabilities }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn name(&self) -> &str {
        self.profile.name
    }

    pub fn supports_skill(&self, skill_id: &str) -> bool {
        self.capabilities.iter().any(|capability| capability.skill_id == skill_id)
    }

    pub fn card(&self) -> AgentCard {
        let endpoints = ["message", "skills", "task"]
            .iter()
            .map(|kind| (kind.to_string(), format!("/api/v1/agents/{}/{kind}", self.agent_id)))
            .collect();

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "framework_specific".to_string(),
            json!({
                "role": self.profile.role,
                "goal": self.profile.goal,
                "allow_delegation": false,
            }),
        );

        AgentCard {
            agent_id: self.agent_id.clone(),
            name: self.profile.name.to_string(),
            description: self.profile.backstory.to_string(),
            framework: AgentFramework::Crewai,
            version: "1.0.0".to_string(),
            capabilities: self.capabilities.clone(),
            endpoints,
            auth_schemes: vec!["bearer".to_string(), "api_key".to_string()],
            metadata,
            status: "active".to_string(),
            last_updated: Utc::now(),
        }
    }

    pub fn execute_skill(&self, skill_id: &str, parameters: &Value) -> SkillExecution {
        let outcome = if self.supports_skill(skill_id) {
            run_skill(skill_id, parameters)
        } else {
            Err(format!("Unknown skill: {skill_id}"))
        };
        SkillExecution::settle(&self.agent_id, skill_id, outcome)
    }
}

/// The built-in agent set registered at startup.
pub struct TransPakAgents {
    sales_briefing: TransPakAgentAdapter,
    crating_design: TransPakAgentAdapter,
    logistics_planner: TransPakAgentAdapter,
    quote_consolidator: TransPakAgentAdapter,
}

impl Default for TransPakAgents {
    fn default() -> Self {
        Self::new()
    }
}

impl TransPakAgents {
    pub fn new() -> Self {
        use CommunicationMode::{File, Form, Json, Media, Text};

        Self {
            sales_briefing: TransPakAgentAdapter::new(
                &SALES_BRIEFING,
                vec![
                    capability(
                        "analyze_shipment",
                        "Shipment Analysis",
                        "Analyze shipment requirements and validate information completeness",
                        SkillCategory::Analysis,
                        vec![Json, Text, Form],
                        &["shipment_data"],
                    ),
                    capability(
                        "validate_requirements",
                        "Requirements Validation",
                        "Validate completeness and accuracy of shipment requirements",
                        SkillCategory::Validation,
                        vec![Json, Text],
                        &["shipment_data"],
                    ),
                ],
            ),
            crating_design: TransPakAgentAdapter::new(
                &CRATING_DESIGN,
                vec![
                    capability(
                        "design_packaging",
                        "Packaging Design",
                        "Design optimal packaging solutions for shipments",
                        SkillCategory::Generation,
                        vec![Json, Text, Media],
                        &["shipment_data"],
                    ),
                    capability(
                        "estimate_materials",
                        "Material Cost Estimation",
                        "Estimate material costs for packaging solutions",
                        SkillCategory::Analysis,
                        vec![Json, Text],
                        &["shipment_data"],
                    ),
                ],
            ),
            logistics_planner: TransPakAgentAdapter::new(
                &LOGISTICS_PLANNER,
                vec![
                    capability(
                        "plan_logistics",
                        "Logistics Planning",
                        "Plan optimal shipping routes and transportation methods",
                        SkillCategory::Processing,
                        vec![Json, Text],
                        &["shipment_data"],
                    ),
                    capability(
                        "optimize_route",
                        "Route Optimization",
                        "Optimize shipping routes for cost and time efficiency",
                        SkillCategory::Processing,
                        vec![Json, Text],
                        &["origin", "destination"],
                    ),
                ],
            ),
            quote_consolidator: TransPakAgentAdapter::new(
                &QUOTE_CONSOLIDATOR,
                vec![
                    capability(
                        "consolidate_quote",
                        "Quote Consolidation",
                        "Consolidate all components into final professional quote",
                        SkillCategory::Integration,
                        vec![Json, Text, File],
                        &["analysis_result", "packaging_result", "logistics_result"],
                    ),
                    capability(
                        "generate_documentation",
                        "Documentation Generation",
                        "Generate shipping and compliance documentation",
                        SkillCategory::Generation,
                        vec![Json, Text, File],
                        &["quote_data"],
                    ),
                ],
            ),
        }
    }

    pub fn all(&self) -> [&TransPakAgentAdapter; 4] {
        [
            &self.sales_briefing,
            &self.crating_design,
            &self.logistics_planner,
            &self.quote_consolidator,
        ]
    }

    pub fn sales_briefing(&self) -> &TransPakAgentAdapter {
        &self.sales_briefing
    }

    pub fn crating_design(&self) -> &TransPakAgentAdapter {
        &self.crating_design
    }

    pub fn logistics_planner(&self) -> &TransPakAgentAdapter {
        &self.logistics_planner
    }

    pub fn quote_consolidator(&self) -> &TransPakAgentAdapter {
        &self.quote_consolidator
    }

    pub fn adapter(&self, agent_id: &str) -> Option<&TransPakAgentAdapter> {
        self.all().into_iter().find(|adapter| adapter.agent_id() == agent_id)
    }

    pub fn adapter_for_skill(&self, skill_id: &str) -> Option<&TransPakAgentAdapter> {
        self.all().into_iter().find(|adapter| adapter.supports_skill(skill_id))
    }

    pub fn is_builtin(&self, agent_id: &str) -> bool {
        self.adapter(agent_id).is_some()
    }

    pub fn register_all(&self, registry: &AgentRegistry) {
        for adapter in self.all() {
            registry.register(adapter.card());
        }
    }

    /// Skill id → display names of the agents offering it.
    pub fn capability_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for adapter in self.all() {
            for capability in &adapter.capabilities {
                map.entry(capability.skill_id.clone())
                    .or_default()
                    .push(adapter.name().to_string());
            }
        }
        map
    }
}

/// `transpak_` followed by the snake-cased agent name.
pub fn agent_id_for(name: &str) -> String {
    let snake: Vec<String> =
        name.split_whitespace().map(|word| word.to_ascii_lowercase()).collect();
    format!("transpak_{}", snake.join("_"))
}

pub(crate) fn capability(
    skill_id: &str,
    name: &str,
    description: &str,
    category: SkillCategory,
    modes: Vec<CommunicationMode>,
    required: &[&str],
) -> AgentCapability {
    AgentCapability {
        skill_id: skill_id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        input_modes: modes.clone(),
        output_modes: modes,
        parameters: json!({ "required": required }),
        version: "1.0".to_string(),
    }
}

fn run_skill(skill_id: &str, parameters: &Value) -> Result<Value, String> {
    match skill_id {
        "analyze_shipment" => Ok(analyze_shipment(&shipment_request(parameters))),
        "validate_requirements" => Ok(requirements_validation(&shipment_request(parameters))),
        "design_packaging" => design_packaging(parameters),
        "estimate_materials" => estimate_materials(parameters),
        "plan_logistics" => plan_logistics(parameters),
        "optimize_route" => Ok(optimize_route(parameters)),
        "consolidate_quote" => Ok(consolidate_quote(parameters)),
        "generate_documentation" => Ok(generate_documentation(parameters)),
        other => Err(format!("Unknown skill: {other}")),
    }
}

/// Reads `shipment_data` leniently: numbers are accepted wherever text is expected.
pub fn shipment_request(parameters: &Value) -> ShipmentRequest {
    let data = parameters.get("shipment_data").unwrap_or(parameters);
    let mut fields: BTreeMap<&str, String> = BTreeMap::new();
    for key in SHIPMENT_FIELDS {
        let text = match data.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => continue,
        };
        fields.insert(key, text);
    }

    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    ShipmentRequest {
        item_description: take("item_description"),
        dimensions: take("dimensions"),
        weight: take("weight"),
        origin: take("origin"),
        destination: take("destination"),
        fragility: take("fragility"),
        special_requirements: take("special_requirements"),
        timeline: take("timeline"),
        declared_value: Some(take("declared_value")).filter(|value| !value.is_empty()),
    }
}

fn validated(parameters: &Value) -> Result<ValidatedShipment, String> {
    shipment_request(parameters).validate().map_err(|error| error.to_string())
}

fn classify_item(description: &str) -> Value {
    let description = description.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|word| description.contains(word));

    let (category, fragility_level, value_category) =
        if mentions(&["electronic", "computer", "equipment"]) {
            ("electronics", "high", "high")
        } else if mentions(&["glass", "crystal", "fragile"]) {
            ("fragile", "extremely_high", "medium")
        } else if mentions(&["machinery", "engine"]) {
            ("machinery", "medium", "high")
        } else {
            ("general", "standard", "medium")
        };

    json!({
        "category": category,
        "fragility_level": fragility_level,
        "hazmat_classification": "none",
        "value_category": value_category,
    })
}

fn assess_risks(fragility_level: &str, weight_lbs: Decimal) -> Value {
    let heavy = weight_lbs > Decimal::from(1000);
    let damage_risk = match fragility_level {
        "extremely_high" => "high",
        "high" => "medium",
        _ if heavy => "medium",
        _ => "low",
    };

    json!({
        "damage_risk": damage_risk,
        "theft_risk": "low",
        "weather_risk": "low",
        "delay_risk": if heavy { "medium" } else { "low" },
        "regulatory_risk": "none",
    })
}

fn completeness_score(missing: usize) -> f64 {
    let total = ShipmentRequest::REQUIRED_FIELDS.len() as f64;
    1.0 - missing as f64 / total
}

fn requirements_validation(request: &ShipmentRequest) -> Value {
    let missing_fields = request.missing_fields();
    json!({
        "valid": missing_fields.is_empty(),
        "completeness_score": completeness_score(missing_fields.len()),
        "missing_fields": missing_fields,
    })
}

fn analyze_shipment(request: &ShipmentRequest) -> Value {
    let classification = classify_item(&request.item_description);
    let fragility_level =
        classification["fragility_level"].as_str().unwrap_or("standard").to_string();
    let weight_lbs =
        crate::domain::shipment::parse_weight(&request.weight).unwrap_or(Decimal::ZERO);
    let validation = requirements_validation(request);
    let complete = validation["valid"].as_bool().unwrap_or(false);

    json!({
        "item_classification": classification,
        "risk_assessment": assess_risks(&fragility_level, weight_lbs),
        "requirements_validation": validation,
        "confidence_score": if complete { 0.9 } else { 0.6 },
    })
}

fn crate_type(parameters: &Value, description: &str) -> &'static str {
    let supplied = parameters
        .get("analysis_result")
        .map(unwrap_result)
        .and_then(|analysis| analysis.pointer("/item_classification/fragility_level"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let level = supplied.unwrap_or_else(|| {
        classify_item(description)["fragility_level"].as_str().unwrap_or("standard").to_string()
    });

    match level.as_str() {
        "extremely_high" => "custom_protective_crate",
        "high" => "padded_wooden_crate",
        _ => "standard_wooden_crate",
    }
}

fn packaging_requirements(special_requirements: &str) -> Vec<&'static str> {
    let lower = special_requirements.to_lowercase();
    [
        ("temperature", "temperature_control"),
        ("humidity", "humidity_control"),
        ("orientation", "orientation_control"),
    ]
    .into_iter()
    .filter(|(keyword, _)| lower.contains(keyword))
    .map(|(_, requirement)| requirement)
    .collect()
}

fn design_packaging(parameters: &Value) -> Result<Value, String> {
    let shipment = validated(parameters)?;
    let measurements = &shipment.measurements;
    let packaging = enhanced_packaging_cost(
        measurements,
        shipment.fragility,
        &shipment.item_description,
        &shipment.origin,
    );
    let clearance = Decimal::from(4);

    Ok(json!({
        "crate_type": crate_type(parameters, &shipment.item_description),
        "materials": PACKAGING_MATERIALS,
        "dimensions": {
            "length_in": measurements.length_in + clearance,
            "width_in": measurements.width_in + clearance,
            "height_in": measurements.height_in + clearance,
            "item_volume_cubic_feet": packaging.volume_cubic_feet,
        },
        "special_requirements": packaging_requirements(&shipment.special_requirements),
        "cost_estimate": packaging,
    }))
}

fn estimate_materials(parameters: &Value) -> Result<Value, String> {
    let shipment = validated(parameters)?;
    let packaging = enhanced_packaging_cost(
        &shipment.measurements,
        shipment.fragility,
        &shipment.item_description,
        &shipment.origin,
    );

    Ok(json!({
        "materials": PACKAGING_MATERIALS,
        "materials_fabrication": packaging.materials_fabrication,
        "protective_cushioning": packaging.special_requirements,
        "assembly_labor": packaging.assembly_labor,
        "total_packaging_cost": packaging.total_packaging_cost,
        "labor_rate": packaging.labor_rate,
    }))
}

fn route_json(origin: &str, destination: &str) -> Value {
    let route = route_estimate(origin, destination);
    json!({
        "primary_route": format!("{origin} -> {destination}"),
        "distance_miles": route.distance_miles,
        "estimated_transit_days": route.estimated_transit_days,
        "route_difficulty": route.route_difficulty,
        "known_route": route.known_route,
        "route_type": "direct",
    })
}

fn plan_logistics(parameters: &Value) -> Result<Value, String> {
    let shipment = validated(parameters)?;
    let measurements = &shipment.measurements;
    let shipping = enhanced_shipping_rate(
        measurements,
        &shipment.origin,
        &shipment.destination,
        shipment.fragility,
    );
    let insurance = insurance_cost(
        &shipment.item_description,
        measurements.weight_lbs,
        shipment.fragility,
        shipment.declared_value.as_deref(),
    );
    let handling =
        special_handling_cost(measurements, shipment.fragility, &shipment.special_requirements);
    let route = route_estimate(&shipment.origin, &shipment.destination);
    let market = MarketSnapshot::current();
    let carrier = market.most_reliable_carrier().cloned();

    let total = shipping.total_transportation_cost
        + insurance.total_insurance_documentation
        + handling.total_special_handling;
    let delivery = Utc::now() + Duration::days(i64::from(route.estimated_transit_days));

    Ok(json!({
        "transportation_mode": "ground_freight",
        "route_optimization": route_json(&shipment.origin, &shipment.destination),
        "carrier_selection": carrier.map(|carrier| json!({
            "carrier_name": carrier.carrier,
            "on_time_delivery": carrier.on_time_delivery,
            "damage_rate": carrier.damage_rate,
            "service_level": "standard",
            "tracking_available": true,
        })),
        "cost_breakdown": {
            "base_freight": shipping.base_freight_cost,
            "fuel_surcharge": shipping.fuel_surcharge,
            "fragile_handling": shipping.fragile_handling_fee,
            "transportation": shipping.total_transportation_cost,
            "insurance": insurance.total_insurance_documentation,
            "handling": handling.total_special_handling,
            "total": total,
        },
        "delivery_timeline": {
            "business_days": route.estimated_transit_days,
            "estimated_delivery": delivery.format("%Y-%m-%d").to_string(),
        },
    }))
}

fn optimize_route(parameters: &Value) -> Value {
    let text = |key: &str| parameters.get(key).and_then(Value::as_str).unwrap_or("").trim();
    let (origin, destination) = (text("origin"), text("destination"));

    let mut route = route_json(origin, destination);
    if let Some(fields) = route.as_object_mut() {
        let fuel_rate = regional_fuel_rate(origin, destination);
        fields.insert("regional_fuel_rate".to_string(), json!(fuel_rate));
        fields.insert("distance_factor".to_string(), json!(distance_factor(origin, destination)));
    }
    route
}

/// Accepts either a bare skill result or a full [`SkillExecution`] envelope.
pub(crate) fn unwrap_result(value: &Value) -> &Value {
    value.get("result").filter(|inner| inner.is_object()).unwrap_or(value)
}

pub(crate) fn decimal_at(value: &Value, pointer: &str) -> Decimal {
    match unwrap_result(value).pointer(pointer) {
        Some(Value::String(text)) => Decimal::from_str(text).unwrap_or(Decimal::ZERO),
        Some(Value::Number(number)) => {
            Decimal::from_str(&number.to_string()).unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    }
}

fn float_at(value: &Value, pointer: &str, default: f64) -> f64 {
    unwrap_result(value).pointer(pointer).and_then(Value::as_f64).unwrap_or(default)
}

fn consolidate_quote(parameters: &Value) -> Value {
    let empty = Value::Null;
    let analysis = parameters.get("analysis_result").unwrap_or(&empty);
    let packaging = parameters.get("packaging_result").unwrap_or(&empty);
    let logistics = parameters.get("logistics_result").unwrap_or(&empty);

    let packaging_total = decimal_at(packaging, "/cost_estimate/total_packaging_cost");
    let logistics_total = decimal_at(logistics, "/cost_breakdown/total");
    let analysis_confidence = float_at(analysis, "/confidence_score", 0.8);
    let completeness = float_at(analysis, "/requirements_validation/completeness_score", 0.8);

    let now = Utc::now();
    let digest = blake3::hash(parameters.to_string().as_bytes());
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    let suffix = u64::from_le_bytes(prefix) % 10_000;

    json!({
        "quote_id": format!("TQ-{}-{suffix:04}", now.format("%Y%m%d")),
        "total_cost": packaging_total + logistics_total,
        "breakdown": {
            "packaging_crating": packaging_total,
            "transportation": decimal_at(logistics, "/cost_breakdown/transportation"),
            "insurance_documentation": decimal_at(logistics, "/cost_breakdown/insurance"),
            "special_handling": decimal_at(logistics, "/cost_breakdown/handling"),
        },
        "terms": QUOTE_TERMS,
        "validity_period": "30 days",
        "confidence_rating": (analysis_confidence + completeness) / 2.0,
    })
}

fn generate_documentation(parameters: &Value) -> Value {
    let quote = parameters.get("quote_data").map(unwrap_result).unwrap_or(parameters);
    let quote_id = quote.get("quote_id").and_then(Value::as_str).unwrap_or("N/A");
    let validity = quote.get("validity_period").and_then(Value::as_str).unwrap_or("30 days");

    let mut lines = vec![
        "TRANSPAK LOGISTICS SOLUTIONS".to_string(),
        "SHIPPING QUOTE DOCUMENTATION".to_string(),
        String::new(),
        format!("Quote ID: {quote_id}"),
        format!("Issued: {}", Utc::now().format("%B %d, %Y")),
        String::new(),
        "COST BREAKDOWN:".to_string(),
    ];
    for (label, key) in [
        ("Packaging & Crating", "packaging_crating"),
        ("Transportation", "transportation"),
        ("Insurance & Documentation", "insurance_documentation"),
        ("Special Handling", "special_handling"),
    ] {
        let amount = decimal_at(quote, &format!("/breakdown/{key}"));
        lines.push(format!("{label}: {}", format_usd(amount)));
    }
    lines.push(String::new());
    lines.push(format!("TOTAL QUOTE: {}", format_usd(decimal_at(quote, "/total_cost"))));
    lines.push(format!("QUOTE VALIDITY: {validity}"));

    if let Some(terms) = quote.get("terms").and_then(Value::as_array) {
        lines.push(String::new());
        lines.push("TERMS:".to_string());
        lines.extend(terms.iter().filter_map(Value::as_str).map(|term| format!("- {term}")));
    }

    json!({
        "document": lines.join("\n"),
        "format": "text/plain",
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use super::{agent_id_for, decimal_at, TransPakAgents};
    use crate::a2a::registry::AgentRegistry;

    fn reference_shipment() -> Value {
        json!({
            "item_description": "Industrial printer",
            "dimensions": "48x36x24",
            "weight": 350,
            "origin": "San Jose, CA",
            "destination": "Austin, TX",
            "fragility": "Standard",
        })
    }

    #[test]
    fn agent_ids_are_snake_cased_names() {
        assert_eq!(agent_id_for("Sales Briefing Agent"), "transpak_sales_briefing_agent");
        let agents = TransPakAgents::new();
        assert_eq!(agents.quote_consolidator().agent_id(), "transpak_quote_consolidator_agent");
        let card = agents.crating_design().card();
        assert_eq!(
            card.endpoints.get("message").map(String::as_str),
            Some("/api/v1/agents/transpak_crating_design_agent/message")
        );
        assert_eq!(card.auth_schemes, vec!["bearer".to_string(), "api_key".to_string()]);
    }

    #[test]
    fn registering_builtins_indexes_eight_skills() {
        let registry = AgentRegistry::new();
        TransPakAgents::new().register_all(&registry);
        let status = registry.status();
        assert_eq!(status.total_agents, 4);
        assert_eq!(status.total_skills, 8);
        assert_eq!(registry.discover_by_skill("optimize_route").len(), 1);
    }

    #[test]
    fn analyze_shipment_classifies_and_scores_completeness() {
        let agents = TransPakAgents::new();
        let execution = agents
            .sales_briefing()
            .execute_skill("analyze_shipment", &json!({"shipment_data": {
                "item_description": "Crystal chandelier",
                "dimensions": "30x30x40",
                "weight": "80 lbs",
                "origin": "Seattle, WA",
            }}));

        assert!(execution.success);
        let result = execution.result.expect("result");
        assert_eq!(result["item_classification"]["fragility_level"], json!("extremely_high"));
        assert_eq!(result["risk_assessment"]["damage_risk"], json!("high"));
        assert_eq!(result["requirements_validation"]["completeness_score"], json!(0.8));
        assert_eq!(result["requirements_validation"]["missing_fields"], json!(["Destination"]));
        assert_eq!(result["confidence_score"], json!(0.6));
    }

    #[test]
    fn design_packaging_uses_pricing_engine() {
        let agents = TransPakAgents::new();
        let execution = agents
            .crating_design()
            .execute_skill("design_packaging", &json!({"shipment_data": reference_shipment()}));

        let result = execution.result.expect("result");
        assert_eq!(result["crate_type"], json!("standard_wooden_crate"));
        assert_eq!(result["materials"].as_array().map(Vec::len), Some(4));
        assert_eq!(
            decimal_at(&result, "/cost_estimate/total_packaging_cost"),
            Decimal::new(196560, 2)
        );
    }

    #[test]
    fn plan_logistics_totals_transport_insurance_and_handling() {
        let agents = TransPakAgents::new();
        let execution = agents
            .logistics_planner()
            .execute_skill("plan_logistics", &json!({"shipment_data": reference_shipment()}));

        let result = execution.result.expect("result");
        assert_eq!(result["transportation_mode"], json!("ground_freight"));
        assert_eq!(result["carrier_selection"]["carrier_name"], json!("FedEx"));
        assert_eq!(decimal_at(&result, "/cost_breakdown/transportation"), Decimal::new(74907, 2));
        assert_eq!(decimal_at(&result, "/cost_breakdown/total"), Decimal::new(116907, 2));
    }

    #[test]
    fn unknown_and_foreign_skills_are_rejected() {
        let agents = TransPakAgents::new();
        let execution = agents.sales_briefing().execute_skill("plan_logistics", &json!({}));
        assert!(!execution.success);
        assert_eq!(execution.error.as_deref(), Some("Unknown skill: plan_logistics"));
    }

    #[test]
    fn invalid_shipment_data_fails_pricing_skills() {
        let agents = TransPakAgents::new();
        let execution = agents
            .crating_design()
            .execute_skill("design_packaging", &json!({"shipment_data": {"weight": "heavy"}}));
        assert!(!execution.success);
        assert!(execution.error.unwrap_or_default().contains("Item Description"));
    }

    #[test]
    fn documentation_renders_quote_data() {
        let agents = TransPakAgents::new();
        let execution = agents.quote_consolidator().execute_skill(
            "generate_documentation",
            &json!({"quote_data": {
                "quote_id": "TQ-20260101-0042",
                "total_cost": "3134.67",
                "breakdown": {"packaging_crating": "1965.60", "transportation": 749.07},
                "terms": ["Payment terms: Net 30 days"],
            }}),
        );

        let document = execution.result.expect("result")["document"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        assert!(document.contains("Quote ID: TQ-20260101-0042"));
        assert!(document.contains("Packaging & Crating: $1,965.60"));
        assert!(document.contains("Transportation: $749.07"));
        assert!(document.contains("TOTAL QUOTE: $3,134.67"));
        assert!(document.contains("- Payment terms: Net 30 days"));
    }
}
