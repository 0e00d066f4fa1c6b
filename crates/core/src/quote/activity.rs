use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shipment::ValidatedShipment;
use crate::pricing::{format_usd, PricedShipment};

pub const SALES_BRIEFING_AGENT: &str = "Sales Briefing Agent";
pub const CRATING_DESIGN_AGENT: &str = "Crating Design Agent";
pub const LOGISTICS_PLANNER_AGENT: &str = "Logistics Planner Agent";
pub const QUOTE_CONSOLIDATOR_AGENT: &str = "Quote Consolidator Agent";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesBriefing {
    pub task: String,
    pub analysis: Vec<String>,
    pub output: String,
    pub market_context: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingComponents {
    pub materials_fabrication: Decimal,
    pub protective_cushioning: Decimal,
    pub assembly_labor: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingEngineering {
    pub task: String,
    pub calculations: Vec<String>,
    pub cost_components: PackagingComponents,
    pub market_data: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsComponents {
    pub base_freight: Decimal,
    pub fuel_surcharge: Decimal,
    pub fragile_handling: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsPlanning {
    pub task: String,
    pub analysis: Vec<String>,
    pub cost_components: LogisticsComponents,
    pub carrier_analysis: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceComponents {
    pub insurance_coverage: Decimal,
    pub documentation_permits: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlingComponents {
    pub loading_unloading: Decimal,
    pub coordination_tracking: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteConsolidation {
    pub task: String,
    pub insurance_documentation: InsuranceComponents,
    pub special_handling: HandlingComponents,
    pub calculation_timestamp: DateTime<Utc>,
    pub confidence_score: Decimal,
}

/// What each of the four specialist agents contributed to a quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActivity {
    pub sales_briefing: SalesBriefing,
    pub packaging_engineering: PackagingEngineering,
    pub logistics_planning: LogisticsPlanning,
    pub quote_consolidation: QuoteConsolidation,
}

impl AgentActivity {
    pub fn from_pricing(shipment: &ValidatedShipment, priced: &PricedShipment) -> Self {
        let route = &priced.route;
        let market = &priced.market.commodities;
        let packaging = &priced.packaging;
        let shipping = &priced.shipping;

        let requirements = if shipment.special_requirements.is_empty() {
            "None specified"
        } else {
            shipment.special_requirements.as_str()
        };

        let carrier_line = priced
            .market
            .carriers
            .iter()
            .filter(|carrier| carrier.carrier == "FedEx" || carrier.carrier == "UPS")
            .map(|carrier| {
                format!(
                    "{}: {:.1}% on-time",
                    carrier.carrier,
                    carrier.on_time_delivery * Decimal::ONE_HUNDRED
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            sales_briefing: SalesBriefing {
                task: "Validated shipment information and identified requirements".to_string(),
                analysis: vec![
                    format!("Confirmed item dimensions: {}", shipment.dimensions),
                    format!(
                        "Validated weight: {} lbs",
                        shipment.measurements.weight_lbs.round_dp(2)
                    ),
                    format!("Assessed fragility level: {}", shipment.fragility),
                    format!("Reviewed special requirements: {requirements}"),
                    format!(
                        "Route analysis: {} miles, {} days",
                        route.distance_miles, route.estimated_transit_days
                    ),
                ],
                output: "Comprehensive shipment briefing prepared for packaging and logistics teams"
                    .to_string(),
                market_context: format!(
                    "Current labor index: {}, Fuel: ${}/gal",
                    market.labor_index_multiplier, market.diesel_fuel_per_gallon
                ),
            },
            packaging_engineering: PackagingEngineering {
                task: format!(
                    "Designed optimal packaging solution for {} fragility items",
                    shipment.fragility
                ),
                calculations: vec![
                    format!("Volume calculation: {} cubic feet", packaging.volume_cubic_feet),
                    format!("Complexity factor: {}", packaging.complexity_factor),
                    format!("Regional labor rate: ${}/hour", packaging.labor_rate),
                    format!("Estimated labor: {} hours", packaging.estimated_labor_hours),
                    format!("Material costs optimized for {} region", shipment.origin),
                ],
                cost_components: PackagingComponents {
                    materials_fabrication: packaging.materials_fabrication,
                    protective_cushioning: packaging.special_requirements,
                    assembly_labor: packaging.assembly_labor,
                    total: packaging.total_packaging_cost,
                },
                market_data: format!(
                    "Wood: ${}/bf, Foam: ${}/cf",
                    market.wood_lumber_per_bf, market.foam_materials_per_cf
                ),
            },
            logistics_planning: LogisticsPlanning {
                task: format!(
                    "Route optimization from {} to {}",
                    shipment.origin, shipment.destination
                ),
                analysis: vec![
                    format!("Route distance: {} miles", route.distance_miles),
                    format!("Transit time: {} business days", route.estimated_transit_days),
                    format!("Route complexity factor: {}", route.route_difficulty),
                    format!("Billable weight: {} lbs", shipping.billable_weight),
                    format!("Regional fuel surcharge: {:.3}", shipping.fuel_rate),
                    "Carrier performance analysis completed".to_string(),
                ],
                cost_components: LogisticsComponents {
                    base_freight: shipping.base_freight_cost,
                    fuel_surcharge: shipping.fuel_surcharge,
                    fragile_handling: shipping.fragile_handling_fee,
                    total: shipping.total_transportation_cost,
                },
                carrier_analysis: carrier_line,
            },
            quote_consolidation: QuoteConsolidation {
                task: "Consolidated all cost components into comprehensive professional quote"
                    .to_string(),
                insurance_documentation: InsuranceComponents {
                    insurance_coverage: priced.insurance.insurance_coverage,
                    documentation_permits: priced.insurance.documentation_permits,
                    total: priced.insurance.total_insurance_documentation,
                },
                special_handling: HandlingComponents {
                    loading_unloading: priced.handling.loading_unloading_service,
                    coordination_tracking: priced.handling.coordination_tracking,
                    total: priced.handling.total_special_handling,
                },
                calculation_timestamp: priced.breakdown.market_timestamp,
                confidence_score: Decimal::new(95, 2),
            },
        }
    }

    /// One-line summary per agent, in pipeline order.
    pub fn summaries(&self) -> Vec<(&'static str, String)> {
        vec![
            (SALES_BRIEFING_AGENT, self.sales_briefing.task.clone()),
            (
                CRATING_DESIGN_AGENT,
                format!(
                    "{} ({})",
                    self.packaging_engineering.task,
                    format_usd(self.packaging_engineering.cost_components.total)
                ),
            ),
            (
                LOGISTICS_PLANNER_AGENT,
                format!(
                    "{} ({})",
                    self.logistics_planning.task,
                    format_usd(self.logistics_planning.cost_components.total)
                ),
            ),
            (QUOTE_CONSOLIDATOR_AGENT, self.quote_consolidation.task.clone()),
        ]
    }
}
