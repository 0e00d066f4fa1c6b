pub mod calculators;
pub mod location;
pub mod market;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shipment::ValidatedShipment;

use self::calculators::{
    enhanced_packaging_cost, enhanced_shipping_rate, insurance_cost, special_handling_cost,
    InsuranceCost, PackagingCost, ShippingRate, SpecialHandlingCost,
};
use self::location::{route_estimate, RouteEstimate};
use self::market::MarketSnapshot;

pub const CALCULATION_METHOD: &str = "enhanced_real_time";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub currency: String,
    pub steps: Vec<PricingTraceStep>,
}

impl PricingTrace {
    fn step(&mut self, stage: &str, detail: impl Into<String>, amount: Decimal) {
        self.steps.push(PricingTraceStep {
            stage: stage.to_string(),
            detail: detail.into(),
            amount,
        });
    }
}

/// Customer-facing cost summary persisted with every quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub packaging_crating: Decimal,
    pub transportation: Decimal,
    pub insurance_documentation: Decimal,
    pub special_handling: Decimal,
    pub total: Decimal,
    pub calculation_method: String,
    pub fuel_rate_applied: Decimal,
    pub labor_rate_applied: Decimal,
    pub market_timestamp: DateTime<Utc>,
}

impl CostBreakdown {
    pub fn component_sum(&self) -> Decimal {
        self.packaging_crating
            + self.transportation
            + self.insurance_documentation
            + self.special_handling
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedShipment {
    pub shipping: ShippingRate,
    pub packaging: PackagingCost,
    pub insurance: InsuranceCost,
    pub handling: SpecialHandlingCost,
    pub route: RouteEstimate,
    pub market: MarketSnapshot,
    pub breakdown: CostBreakdown,
    pub trace: PricingTrace,
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, shipment: &ValidatedShipment, at: DateTime<Utc>) -> PricedShipment;
}

/// Regional fuel and labor adjustments on top of the base calculators.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnhancedPricingEngine;

impl PricingEngine for EnhancedPricingEngine {
    fn price(&self, shipment: &ValidatedShipment, at: DateTime<Utc>) -> PricedShipment {
        price_shipment_with_trace(shipment, at)
    }
}

pub fn price_shipment_with_trace(
    shipment: &ValidatedShipment,
    at: DateTime<Utc>,
) -> PricedShipment {
    let measurements = &shipment.measurements;
    let packaging = enhanced_packaging_cost(
        measurements,
        shipment.fragility,
        &shipment.item_description,
        &shipment.origin,
    );
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

    let mut trace = PricingTrace { currency: "USD".to_string(), steps: Vec::new() };
    trace.step(
        "packaging",
        format!(
            "{} cu ft x complexity {} ; {} h @ ${}/h",
            packaging.volume_cubic_feet,
            packaging.complexity_factor,
            packaging.estimated_labor_hours,
            packaging.labor_rate
        ),
        packaging.total_packaging_cost,
    );
    trace.step(
        "transportation",
        format!(
            "{} lbs billable x lane {} x fragility {} ; fuel {}",
            shipping.billable_weight,
            shipping.distance_factor,
            shipping.fragility_multiplier,
            shipping.fuel_rate.round_dp(3)
        ),
        shipping.total_transportation_cost,
    );
    trace.step(
        "insurance_documentation",
        format!(
            "{}% of ${} declared + ${} documentation",
            insurance.insurance_rate_percent,
            insurance.declared_value,
            insurance.documentation_permits
        ),
        insurance.total_insurance_documentation,
    );
    trace.step(
        "special_handling",
        format!(
            "loading ${} + coordination ${}",
            handling.loading_unloading_service, handling.coordination_tracking
        ),
        handling.total_special_handling,
    );

    let breakdown = CostBreakdown {
        packaging_crating: packaging.total_packaging_cost,
        transportation: shipping.total_transportation_cost,
        insurance_documentation: insurance.total_insurance_documentation,
        special_handling: handling.total_special_handling,
        total: packaging.total_packaging_cost
            + shipping.total_transportation_cost
            + insurance.total_insurance_documentation
            + handling.total_special_handling,
        calculation_method: CALCULATION_METHOD.to_string(),
        fuel_rate_applied: shipping.fuel_rate,
        labor_rate_applied: packaging.labor_rate,
        market_timestamp: at,
    };
    trace.step("total", "sum of the four components", breakdown.total);

    PricedShipment {
        route: route_estimate(&shipment.origin, &shipment.destination),
        market: MarketSnapshot::current(),
        shipping,
        packaging,
        insurance,
        handling,
        breakdown,
        trace,
    }
}

/// Formats an amount as `$1,234.56`.
pub fn format_usd(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2).abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}
