//! Partner validators hosted alongside the crew: a pricing validator that compares a
//! consolidated quote with market reference rates, and a compliance checker that screens
//! the shipment before it ships. Both register as `external` agents but answer in-process,
//! and [`CrossFrameworkOrchestrator`] runs them after the four-agent workflow.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::adapters::{capability, decimal_at, shipment_request, SkillExecution, TransPakAgents};
use super::registry::AgentRegistry;
use super::types::{
    AgentCapability, AgentCard, AgentFramework, CommunicationMode, SkillCategory, HOSTING_KEY,
    IN_PROCESS_HOSTING,
};
use super::workflow::{CrossFrameworkWorkflow, WorkflowOutcome};
use crate::domain::shipment::ShipmentRequest;
use crate::pricing::location::regional_fuel_rate;
use crate::pricing::market::MarketSnapshot;

pub const PRICING_VALIDATOR_ID: &str = "external_pricing_validator";
pub const COMPLIANCE_CHECKER_ID: &str = "external_compliance_checker";
pub const ENHANCED_WORKFLOW_TYPE: &str = "enhanced_with_external_validation";

// market reference factors and the variance each component tolerates, in hundredths
const PACKAGING_MARKET_FACTOR: i64 = 95;
const PACKAGING_TOLERANCE: i64 = 15;
const FREIGHT_MARKET_FACTOR: i64 = 102;
const FREIGHT_TOLERANCE: i64 = 12;
const APPROVAL_TOLERANCE: i64 = 15;
const COMPETITIVE_TOLERANCE: i64 = 10;
const CONFIDENCE_FLOOR: i64 = 60;

const ALIGNED_PRICING: &str = "Pricing is aligned with current market rates";
const ALL_CHECKS_PASSED: &str = "All compliance checks passed - shipment ready for processing";

// first matching keyword group wins
const TARIFF_CODES: [(&[&str], &str); 5] = [
    (&["electronic", "computer", "printer", "server"], "8471.30.01"),
    (&["machinery", "engine", "generator"], "8479.89.94"),
    (&["painting", "artwork", "sculpture"], "9701.10.00"),
    (&["piano", "instrument"], "9201.10.00"),
    (&["furniture", "cabinet", "table"], "9403.60.80"),
];
const EXPORT_CONTROLLED: [&str; 5] = ["laser", "encryption", "military", "firearm", "night vision"];
const HAZARDOUS: [&str; 5] = ["flammable", "explosive", "hazmat", "chemical", "radioactive"];
const BATTERY: [&str; 2] = ["lithium", "battery"];

const US_STATE_CODES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];
const US_MARKERS: [&str; 3] = ["US", "USA", "UNITED STATES"];

const BASE_DOCUMENTS: [&str; 3] = ["Commercial Invoice", "Packing List", "Bill of Lading"];
const EXPORT_DECLARATION: &str = "Export Declaration";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    WithinRange,
    OutsideRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingStatus {
    Approved,
    ReviewRequired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPosition {
    Competitive,
    Premium,
    Discount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentValidation {
    pub quoted: Decimal,
    pub market_average: Decimal,
    pub variance_percent: Decimal,
    pub status: RangeStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingValidation {
    pub validation_id: String,
    pub overall_status: PricingStatus,
    pub overall_variance_percent: Decimal,
    pub confidence_score: Decimal,
    pub market_position: MarketPosition,
    pub components: BTreeMap<String, ComponentValidation>,
    pub recommendations: Vec<String>,
    pub validated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Compliant,
    Warning,
    RequiresAttention,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub name: String,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    CompliantWithWarnings,
    RequiresAttention,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub compliance_id: String,
    pub overall_status: ComplianceStatus,
    pub cross_border: bool,
    pub checks: Vec<ComplianceCheck>,
    pub required_documents: Vec<String>,
    pub recommendations: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

fn hundredths(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

fn external_card(
    agent_id: &str,
    name: &str,
    description: &str,
    version: &str,
    provider: &str,
    capabilities: &[AgentCapability],
) -> AgentCard {
    let mut metadata = BTreeMap::new();
    metadata.insert(HOSTING_KEY.to_string(), json!(IN_PROCESS_HOSTING));
    metadata.insert("provider".to_string(), json!(provider));

    AgentCard {
        agent_id: agent_id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        framework: AgentFramework::External,
        version: version.to_string(),
        capabilities: capabilities.to_vec(),
        endpoints: BTreeMap::from([(
            "message".to_string(),
            format!("/api/v1/a2a/agents/{agent_id}/message"),
        )]),
        auth_schemes: vec!["bearer".to_string()],
        metadata,
        status: "active".to_string(),
        last_updated: Utc::now(),
    }
}

fn required_text<'a>(parameters: &'a Value, key: &str) -> Result<&'a str, String> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| format!("Missing required parameter: {key}"))
}

pub struct ExternalPricingAgent {
    capabilities: Vec<AgentCapability>,
}

impl Default for ExternalPricingAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalPricingAgent {
    pub fn new() -> Self {
        let modes = vec![CommunicationMode::Json];
        Self {
            capabilities: vec![
                capability(
                    "validate_pricing",
                    "Pricing Validation",
                    "Compare a consolidated quote with market reference rates",
                    SkillCategory::Validation,
                    modes.clone(),
                    &["quote_data"],
                ),
                capability(
                    "market_analysis",
                    "Market Analysis",
                    "Summarize current market conditions for a region and service",
                    SkillCategory::Analysis,
                    modes,
                    &["region", "service_type"],
                ),
            ],
        }
    }

    pub fn card(&self) -> AgentCard {
        external_card(
            PRICING_VALIDATOR_ID,
            "External Pricing Validation Agent",
            "Validates quote components against market reference pricing",
            "2.1.0",
            "PriceCheck Partners",
            &self.capabilities,
        )
    }

    /// Packaging is checked against 95% of its quoted value and freight (transport plus
    /// handling) against 102%, mirroring the partner's reference rates.
    pub fn validate_pricing(&self, quote: &Value) -> Result<PricingValidation, String> {
        let total = decimal_at(quote, "/total_cost");
        if total <= Decimal::ZERO {
            return Err("quote_data has no total_cost".to_string());
        }

        let packaging = component(
            "packaging",
            decimal_at(quote, "/breakdown/packaging_crating"),
            PACKAGING_MARKET_FACTOR,
            PACKAGING_TOLERANCE,
        )?;
        let freight = component(
            "freight",
            decimal_at(quote, "/breakdown/transportation")
                + decimal_at(quote, "/breakdown/special_handling"),
            FREIGHT_MARKET_FACTOR,
            FREIGHT_TOLERANCE,
        )?;

        let market_total = packaging.market_average + freight.market_average;
        let overall_variance = (total - market_total).abs() / total;
        let overall_status = if overall_variance < hundredths(APPROVAL_TOLERANCE) {
            PricingStatus::Approved
        } else {
            PricingStatus::ReviewRequired
        };
        let market_position = if overall_variance < hundredths(COMPETITIVE_TOLERANCE) {
            MarketPosition::Competitive
        } else if total > market_total {
            MarketPosition::Premium
        } else {
            MarketPosition::Discount
        };
        let confidence_score =
            (Decimal::ONE - overall_variance).max(hundredths(CONFIDENCE_FLOOR)).round_dp(2);

        let components = BTreeMap::from([
            ("packaging".to_string(), packaging),
            ("freight".to_string(), freight),
        ]);
        let flag_above = Decimal::from(APPROVAL_TOLERANCE);
        let mut recommendations: Vec<String> = components
            .iter()
            .filter(|(_, check)| {
                check.status == RangeStatus::OutsideRange && check.variance_percent > flag_above
            })
            .map(|(name, check)| {
                format!(
                    "Consider adjusting {name} pricing - {}% variance from market",
                    check.variance_percent
                )
            })
            .collect();
        if recommendations.is_empty() {
            recommendations.push(ALIGNED_PRICING.to_string());
        }

        let validated_at = Utc::now();
        Ok(PricingValidation {
            validation_id: format!("VAL-{}", validated_at.format("%Y%m%d%H%M%S")),
            overall_status,
            overall_variance_percent: (overall_variance * Decimal::ONE_HUNDRED).round_dp(1),
            confidence_score,
            market_position,
            components,
            recommendations,
            validated_at,
        })
    }

    pub fn market_analysis(&self, region: &str, service_type: &str) -> Value {
        let market = MarketSnapshot::current();
        json!({
            "region": region,
            "service_type": service_type,
            "regional_fuel_rate": regional_fuel_rate(region, region),
            "diesel_fuel_per_gallon": market.commodities.diesel_fuel_per_gallon,
            "labor_index_multiplier": market.commodities.labor_index_multiplier,
            "recommended_carrier": market.most_reliable_carrier().map(|carrier| &carrier.carrier),
            "reference_factors": {
                "packaging": hundredths(PACKAGING_MARKET_FACTOR),
                "freight": hundredths(FREIGHT_MARKET_FACTOR),
            },
        })
    }

    fn run_skill(&self, skill_id: &str, parameters: &Value) -> Result<Value, String> {
        match skill_id {
            "validate_pricing" => {
                let quote = parameters
                    .get("quote_data")
                    .ok_or_else(|| "Missing required parameter: quote_data".to_string())?;
                let validation = self.validate_pricing(quote)?;
                serde_json::to_value(validation).map_err(|error| error.to_string())
            }
            "market_analysis" => Ok(self.market_analysis(
                required_text(parameters, "region")?,
                required_text(parameters, "service_type")?,
            )),
            other => Err(format!("Unknown skill: {other}")),
        }
    }
}

fn component(
    name: &str,
    quoted: Decimal,
    market_factor: i64,
    tolerance: i64,
) -> Result<ComponentValidation, String> {
    if quoted <= Decimal::ZERO {
        return Err(format!("quote_data has no {name} cost"));
    }
    let market_average = (quoted * hundredths(market_factor)).round_dp(2);
    let variance = (quoted - market_average).abs() / market_average;
    Ok(ComponentValidation {
        quoted,
        market_average,
        variance_percent: (variance * Decimal::ONE_HUNDRED).round_dp(1),
        status: if variance < hundredths(tolerance) {
            RangeStatus::WithinRange
        } else {
            RangeStatus::OutsideRange
        },
    })
}

pub struct ExternalComplianceAgent {
    capabilities: Vec<AgentCapability>,
}

impl Default for ExternalComplianceAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalComplianceAgent {
    pub fn new() -> Self {
        let modes = vec![CommunicationMode::Json];
        Self {
            capabilities: vec![
                capability(
                    "check_regulations",
                    "Regulatory Check",
                    "Screen a shipment for customs, export and restricted-item rules",
                    SkillCategory::Validation,
                    modes.clone(),
                    &["origin", "destination", "item_description"],
                ),
                capability(
                    "generate_documentation",
                    "Compliance Documentation",
                    "List the shipping documents a compliance report calls for",
                    SkillCategory::Generation,
                    modes,
                    &["compliance_report"],
                ),
            ],
        }
    }

    pub fn card(&self) -> AgentCard {
        external_card(
            COMPLIANCE_CHECKER_ID,
            "External Compliance Checker",
            "Checks shipments against customs and transport regulations",
            "3.0.1",
            "ClearPath Compliance",
            &self.capabilities,
        )
    }

    pub fn check_regulations(&self, shipment: &Value) -> Result<ComplianceReport, String> {
        let data = shipment.get("shipment_data").unwrap_or(shipment);
        for key in ["origin", "destination", "item_description"] {
            required_text(data, key)?;
        }
        let request = shipment_request(data);
        let item = request.item_description.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|word| item.contains(word));
        let cross_border = !is_domestic(&request.origin) || !is_domestic(&request.destination);

        let checks = vec![
            customs_classification(&item, cross_border),
            export_controls(mentions(&EXPORT_CONTROLLED)),
            restricted_items(mentions(&HAZARDOUS), mentions(&BATTERY)),
            packaging_markings(&request),
            documentation_requirements(cross_border),
        ];

        let overall_status = if checks.iter().any(|c| c.status == CheckStatus::RequiresAttention) {
            ComplianceStatus::RequiresAttention
        } else if checks.iter().any(|c| c.status == CheckStatus::Warning) {
            ComplianceStatus::CompliantWithWarnings
        } else {
            ComplianceStatus::Compliant
        };

        let mut recommendations: Vec<String> = checks
            .iter()
            .filter(|check| check.status != CheckStatus::Compliant)
            .map(|check| format!("Address {} requirements before shipping", check.name))
            .collect();
        if recommendations.is_empty() {
            recommendations.push(ALL_CHECKS_PASSED.to_string());
        }

        let mut required_documents: Vec<String> =
            BASE_DOCUMENTS.iter().map(|doc| doc.to_string()).collect();
        if cross_border {
            required_documents.push(EXPORT_DECLARATION.to_string());
        }

        let checked_at = Utc::now();
        Ok(ComplianceReport {
            compliance_id: format!("CMP-{}", checked_at.format("%Y%m%d%H%M%S")),
            overall_status,
            cross_border,
            checks,
            required_documents,
            recommendations,
            checked_at,
        })
    }

    /// Every document starts out pending; the shipment is releasable unless a check
    /// still requires attention.
    pub fn generate_documentation(&self, report: &Value) -> Value {
        let documents: Vec<Value> = report
            .get("required_documents")
            .and_then(Value::as_array)
            .map(|docs| docs.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_else(|| BASE_DOCUMENTS.to_vec())
            .into_iter()
            .map(|name| json!({ "name": name, "status": "pending" }))
            .collect();
        let blocked = report.get("overall_status").and_then(Value::as_str)
            == Some("requires_attention");

        json!({
            "documents": documents,
            "ready_to_ship": !blocked,
            "generated_at": Utc::now(),
        })
    }

    fn run_skill(&self, skill_id: &str, parameters: &Value) -> Result<Value, String> {
        match skill_id {
            "check_regulations" => {
                let report = self.check_regulations(parameters)?;
                serde_json::to_value(report).map_err(|error| error.to_string())
            }
            "generate_documentation" => {
                let report = parameters
                    .get("compliance_report")
                    .ok_or_else(|| "Missing required parameter: compliance_report".to_string())?;
                Ok(self.generate_documentation(report))
            }
            other => Err(format!("Unknown skill: {other}")),
        }
    }
}

/// Addresses read as "City, ST" or "City, ST, USA"; a bare city counts as domestic.
fn is_domestic(place: &str) -> bool {
    let segments: Vec<String> =
        place.split(',').map(|segment| segment.trim().to_uppercase()).collect();
    let region = match segments.as_slice() {
        [_] => return true,
        [.., region, country] if US_MARKERS.contains(&country.as_str()) => region,
        [.., region] => region,
        [] => return true,
    };
    US_STATE_CODES.contains(&region.as_str()) || US_MARKERS.contains(&region.as_str())
}

fn check(name: &str, status: CheckStatus, notes: Vec<String>) -> ComplianceCheck {
    ComplianceCheck { name: name.to_string(), status, notes, details: BTreeMap::new() }
}

fn customs_classification(item: &str, cross_border: bool) -> ComplianceCheck {
    let code = TARIFF_CODES
        .iter()
        .find(|(words, _)| words.iter().any(|word| item.contains(word)))
        .map(|(_, code)| *code);
    let mut result = match code {
        Some(_) => check("customs_classification", CheckStatus::Compliant, Vec::new()),
        None if cross_border => check(
            "customs_classification",
            CheckStatus::RequiresAttention,
            vec!["No tariff classification matched; an HS code is required to clear customs"
                .to_string()],
        ),
        None => check(
            "customs_classification",
            CheckStatus::Warning,
            vec!["No tariff classification matched; confirm the HS code with the customer"
                .to_string()],
        ),
    };
    if let Some(code) = code {
        result.details.insert("hs_code".to_string(), json!(code));
    }
    result
}

fn export_controls(controlled: bool) -> ComplianceCheck {
    let mut result = if controlled {
        check(
            "export_controls",
            CheckStatus::RequiresAttention,
            vec!["Item may be subject to export licensing".to_string()],
        )
    } else {
        check("export_controls", CheckStatus::Compliant, Vec::new())
    };
    result.details.insert("license_required".to_string(), json!(controlled));
    result
}

fn restricted_items(hazardous: bool, battery: bool) -> ComplianceCheck {
    if hazardous {
        check(
            "restricted_items",
            CheckStatus::RequiresAttention,
            vec!["Hazardous materials need a dangerous goods declaration".to_string()],
        )
    } else if battery {
        check(
            "restricted_items",
            CheckStatus::Warning,
            vec!["Lithium batteries need UN3480/UN3481 labelling".to_string()],
        )
    } else {
        check("restricted_items", CheckStatus::Compliant, Vec::new())
    }
}

fn packaging_markings(request: &ShipmentRequest) -> ComplianceCheck {
    let fragility = request.fragility.trim();
    let mut markings = vec!["this_side_up"];
    if !fragility.is_empty() && !fragility.eq_ignore_ascii_case("standard") {
        markings.insert(0, "fragile");
    }
    let mut result = check("packaging_requirements", CheckStatus::Compliant, Vec::new());
    result.details.insert("markings".to_string(), json!(markings));
    result
}

fn documentation_requirements(cross_border: bool) -> ComplianceCheck {
    let mut result = check("documentation_requirements", CheckStatus::Compliant, Vec::new());
    result.details.insert("export_declaration".to_string(), json!(cross_border));
    result
}

/// The partner validators this process hosts.
#[derive(Default)]
pub struct ExternalValidators {
    pricing: ExternalPricingAgent,
    compliance: ExternalComplianceAgent,
}

impl ExternalValidators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pricing(&self) -> &ExternalPricingAgent {
        &self.pricing
    }

    pub fn compliance(&self) -> &ExternalComplianceAgent {
        &self.compliance
    }

    pub fn is_hosted(&self, agent_id: &str) -> bool {
        agent_id == PRICING_VALIDATOR_ID || agent_id == COMPLIANCE_CHECKER_ID
    }

    pub fn register_all(&self, registry: &AgentRegistry) {
        registry.register(self.pricing.card());
        registry.register(self.compliance.card());
    }

    /// `None` when `agent_id` is not hosted here.
    pub fn execute_skill(
        &self,
        agent_id: &str,
        skill_id: &str,
        parameters: &Value,
    ) -> Option<SkillExecution> {
        let outcome = match agent_id {
            PRICING_VALIDATOR_ID => self.pricing.run_skill(skill_id, parameters),
            COMPLIANCE_CHECKER_ID => self.compliance.run_skill(skill_id, parameters),
            _ => return None,
        };
        Some(SkillExecution::settle(agent_id, skill_id, outcome))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancedStatus {
    FullyApproved,
    ApprovedWithConditions,
    RequiresReview,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnhancedWorkflowOutcome {
    pub workflow_type: String,
    pub final_status: EnhancedStatus,
    pub workflow: WorkflowOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_validation: Option<PricingValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_check: Option<ComplianceReport>,
    pub recommendations: Vec<String>,
}

/// Runs the crew workflow, then has the partner validators review its quote and shipment.
pub struct CrossFrameworkOrchestrator<'a> {
    agents: &'a TransPakAgents,
    validators: &'a ExternalValidators,
}

impl<'a> CrossFrameworkOrchestrator<'a> {
    pub fn new(agents: &'a TransPakAgents, validators: &'a ExternalValidators) -> Self {
        Self { agents, validators }
    }

    pub fn execute(&self, shipment_data: &Value) -> EnhancedWorkflowOutcome {
        let workflow = CrossFrameworkWorkflow::new(self.agents).execute(shipment_data);
        let mut outcome = EnhancedWorkflowOutcome {
            workflow_type: ENHANCED_WORKFLOW_TYPE.to_string(),
            final_status: EnhancedStatus::Failed,
            workflow,
            pricing_validation: None,
            compliance_check: None,
            recommendations: Vec::new(),
        };
        let Some(quote) = outcome.workflow.results.quote.clone() else {
            return outcome;
        };

        match self.validators.pricing.validate_pricing(&quote) {
            Ok(validation) => {
                outcome.recommendations.extend(
                    validation.recommendations.iter().map(|item| format!("Pricing: {item}")),
                );
                outcome.pricing_validation = Some(validation);
            }
            Err(error) => outcome.recommendations.push(format!("Pricing: {error}")),
        }
        match self.validators.compliance.check_regulations(shipment_data) {
            Ok(report) => {
                outcome.recommendations.extend(
                    report.recommendations.iter().map(|item| format!("Compliance: {item}")),
                );
                outcome.compliance_check = Some(report);
            }
            Err(error) => outcome.recommendations.push(format!("Compliance: {error}")),
        }

        outcome.final_status = final_status(
            outcome.pricing_validation.as_ref().map(|pricing| pricing.overall_status),
            outcome.compliance_check.as_ref().map(|report| report.overall_status),
        );
        info!(
            event_name = "a2a.workflow.enhanced",
            workflow_id = %outcome.workflow.workflow_id,
            final_status = ?outcome.final_status,
            "enhanced workflow completed"
        );
        outcome
    }
}

fn final_status(
    pricing: Option<PricingStatus>,
    compliance: Option<ComplianceStatus>,
) -> EnhancedStatus {
    use ComplianceStatus::{Compliant, CompliantWithWarnings};

    match (pricing, compliance) {
        (Some(PricingStatus::Approved), Some(Compliant)) => EnhancedStatus::FullyApproved,
        (Some(_), Some(Compliant | CompliantWithWarnings)) => {
            EnhancedStatus::ApprovedWithConditions
        }
        _ => EnhancedStatus::RequiresReview,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use super::{
        final_status, CheckStatus, ComplianceStatus, CrossFrameworkOrchestrator, EnhancedStatus,
        ExternalValidators, MarketPosition, PricingStatus, RangeStatus, COMPLIANCE_CHECKER_ID,
        PRICING_VALIDATOR_ID,
    };
    use crate::a2a::adapters::TransPakAgents;
    use crate::a2a::registry::AgentRegistry;

    fn quote(total: &str, packaging: &str, transport: &str, handling: &str) -> Value {
        json!({
            "quote_id": "TQ-20260101-0001",
            "total_cost": total,
            "breakdown": {
                "packaging_crating": packaging,
                "transportation": transport,
                "insurance_documentation": "100.00",
                "special_handling": handling,
            }
        })
    }

    fn printer() -> Value {
        json!({
            "item_description": "Industrial printer",
            "dimensions": "48x36x24",
            "weight": "350 lbs",
            "origin": "San Jose, CA",
            "destination": "Austin, TX",
            "fragility": "Fragile"
        })
    }

    #[test]
    fn aligned_quote_is_approved_and_competitive() {
        let validators = ExternalValidators::new();
        let validation = validators
            .pricing()
            .validate_pricing(&quote("2600.00", "800.00", "1500.00", "200.00"))
            .expect("validation");

        assert_eq!(validation.overall_status, PricingStatus::Approved);
        assert_eq!(validation.market_position, MarketPosition::Competitive);
        assert_eq!(validation.components["packaging"].market_average, Decimal::new(76000, 2));
        assert_eq!(validation.components["freight"].quoted, Decimal::new(170000, 2));
        assert_eq!(validation.components["freight"].status, RangeStatus::WithinRange);
        assert_eq!(validation.overall_variance_percent, Decimal::new(41, 1));
        assert_eq!(validation.confidence_score, Decimal::new(96, 2));
        assert_eq!(validation.recommendations, vec![super::ALIGNED_PRICING.to_string()]);
        assert!(validation.validation_id.starts_with("VAL-"));
    }

    #[test]
    fn padded_total_needs_review_as_premium() {
        let validators = ExternalValidators::new();
        let validation = validators
            .pricing()
            .validate_pricing(&quote("5000.00", "800.00", "1500.00", "200.00"))
            .expect("validation");

        assert_eq!(validation.overall_status, PricingStatus::ReviewRequired);
        assert_eq!(validation.market_position, MarketPosition::Premium);
        assert_eq!(validation.confidence_score, Decimal::new(60, 2));
    }

    #[test]
    fn quotes_without_costs_are_rejected() {
        let pricing = ExternalValidators::new();
        let empty = pricing.pricing().validate_pricing(&json!({}));
        assert_eq!(empty.err().as_deref(), Some("quote_data has no total_cost"));

        let no_packaging =
            pricing.pricing().validate_pricing(&quote("900.00", "0", "800.00", "0"));
        assert_eq!(no_packaging.err().as_deref(), Some("quote_data has no packaging cost"));
    }

    #[test]
    fn domestic_electronics_pass_every_check() {
        let validators = ExternalValidators::new();
        let report = validators.compliance().check_regulations(&printer()).expect("report");

        assert_eq!(report.overall_status, ComplianceStatus::Compliant);
        assert!(!report.cross_border);
        assert_eq!(report.checks[0].details["hs_code"], json!("8471.30.01"));
        assert_eq!(report.checks[3].details["markings"], json!(["fragile", "this_side_up"]));
        assert_eq!(report.required_documents.len(), 3);
        assert_eq!(report.recommendations, vec![super::ALL_CHECKS_PASSED.to_string()]);
    }

    #[test]
    fn cross_border_and_restricted_items_need_attention() {
        let validators = ExternalValidators::new();
        let mut shipment = printer();
        shipment["destination"] = json!("Toronto, Ontario");
        shipment["item_description"] = json!("Lithium battery packs");

        let report = validators.compliance().check_regulations(&shipment).expect("report");
        assert!(report.cross_border);
        assert_eq!(report.overall_status, ComplianceStatus::RequiresAttention);
        assert_eq!(report.checks[0].status, CheckStatus::RequiresAttention);
        assert_eq!(report.checks[2].status, CheckStatus::Warning);
        assert!(report.required_documents.contains(&"Export Declaration".to_string()));
        assert_eq!(
            report.recommendations,
            vec![
                "Address customs_classification requirements before shipping".to_string(),
                "Address restricted_items requirements before shipping".to_string(),
            ]
        );

        let missing = validators.compliance().check_regulations(&json!({"origin": "Reno, NV"}));
        assert_eq!(missing.err().as_deref(), Some("Missing required parameter: destination"));
    }

    #[test]
    fn addresses_outside_us_states_are_cross_border() {
        assert!(super::is_domestic("Austin, TX"));
        assert!(super::is_domestic("Reno, nv, USA"));
        assert!(super::is_domestic("Chicago"));
        assert!(!super::is_domestic("Toronto, Ontario"));
        assert!(!super::is_domestic("Monterrey, NL, Mexico"));
    }

    #[test]
    fn hosted_validators_register_and_execute_skills() {
        let registry = AgentRegistry::new();
        let validators = ExternalValidators::new();
        validators.register_all(&registry);

        let card = registry.get(PRICING_VALIDATOR_ID).expect("registered");
        assert!(card.is_in_process());
        assert_eq!(registry.list().len(), 2);

        let market = validators
            .execute_skill(
                PRICING_VALIDATOR_ID,
                "market_analysis",
                &json!({"region": "Austin, TX", "service_type": "freight"}),
            )
            .expect("hosted");
        assert!(market.success);
        assert_eq!(market.result.expect("result")["recommended_carrier"], json!("FedEx"));

        let docs = validators
            .execute_skill(
                COMPLIANCE_CHECKER_ID,
                "generate_documentation",
                &json!({"compliance_report": {
                    "overall_status": "requires_attention",
                    "required_documents": ["Commercial Invoice"]
                }}),
            )
            .expect("hosted");
        let result = docs.result.expect("result");
        assert_eq!(result["ready_to_ship"], json!(false));
        assert_eq!(result["documents"][0]["status"], json!("pending"));

        let unknown = validators
            .execute_skill(COMPLIANCE_CHECKER_ID, "teleport", &json!({}))
            .expect("hosted");
        assert_eq!(unknown.error.as_deref(), Some("Unknown skill: teleport"));
        assert!(validators.execute_skill("nobody", "teleport", &json!({})).is_none());
    }

    #[test]
    fn final_status_combines_pricing_and_compliance() {
        use ComplianceStatus::*;
        use PricingStatus::*;

        assert_eq!(final_status(Some(Approved), Some(Compliant)), EnhancedStatus::FullyApproved);
        assert_eq!(
            final_status(Some(ReviewRequired), Some(CompliantWithWarnings)),
            EnhancedStatus::ApprovedWithConditions
        );
        assert_eq!(
            final_status(Some(Approved), Some(RequiresAttention)),
            EnhancedStatus::RequiresReview
        );
        assert_eq!(final_status(None, Some(Compliant)), EnhancedStatus::RequiresReview);
    }

    #[test]
    fn orchestrator_validates_the_crew_quote() {
        let agents = TransPakAgents::new();
        let validators = ExternalValidators::new();

        let outcome = CrossFrameworkOrchestrator::new(&agents, &validators).execute(&printer());
        assert!(outcome.workflow.success);
        assert_eq!(outcome.workflow_type, "enhanced_with_external_validation");
        assert!(outcome.pricing_validation.is_some());
        assert_eq!(
            outcome.compliance_check.as_ref().map(|report| report.overall_status),
            Some(ComplianceStatus::Compliant)
        );
        assert_ne!(outcome.final_status, EnhancedStatus::Failed);
        assert!(outcome.recommendations.iter().any(|item| item.starts_with("Pricing: ")));
        assert!(outcome.recommendations.iter().any(|item| item.starts_with("Compliance: ")));
    }

    #[test]
    fn orchestrator_reports_failed_workflows() {
        let agents = TransPakAgents::new();
        let validators = ExternalValidators::new();

        let outcome =
            CrossFrameworkOrchestrator::new(&agents, &validators).execute(&json!({"weight": "x"}));
        assert!(!outcome.workflow.success);
        assert_eq!(outcome.final_status, EnhancedStatus::Failed);
        assert!(outcome.pricing_validation.is_none());
        assert!(outcome.recommendations.is_empty());
    }
}
