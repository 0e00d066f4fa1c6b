//! Closed-form cost calculators. Reported amounts are rounded to cents.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shipment::{Fragility, Measurements};
use crate::pricing::location::{distance_factor, regional_fuel_rate, regional_labor_rate};

const DIM_FACTOR: i64 = 139;
const DEFAULT_DECLARED_VALUE: i64 = 5000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub base_freight_cost: Decimal,
    pub fuel_surcharge: Decimal,
    pub fragile_handling_fee: Decimal,
    pub total_transportation_cost: Decimal,
    pub billable_weight: Decimal,
    pub dimensional_weight: Decimal,
    pub distance_factor: Decimal,
    pub fragility_multiplier: Decimal,
    pub fuel_rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingCost {
    pub materials_fabrication: Decimal,
    pub assembly_labor: Decimal,
    pub special_requirements: Decimal,
    pub total_packaging_cost: Decimal,
    pub volume_cubic_feet: Decimal,
    pub complexity_factor: Decimal,
    pub estimated_labor_hours: Decimal,
    pub labor_rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceCost {
    pub insurance_coverage: Decimal,
    pub documentation_permits: Decimal,
    pub total_insurance_documentation: Decimal,
    pub declared_value: Decimal,
    pub insurance_rate_percent: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialHandlingCost {
    pub loading_unloading_service: Decimal,
    pub coordination_tracking: Decimal,
    pub total_special_handling: Decimal,
    pub fragility_premium: Decimal,
    pub special_requirements_cost: Decimal,
}

pub(crate) fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}

fn shipping_multiplier(fragility: Fragility) -> Decimal {
    match fragility {
        Fragility::Standard => Decimal::ONE,
        Fragility::Fragile => Decimal::new(13, 1),
        Fragility::HighValue => Decimal::new(15, 1),
        Fragility::ExtremelyFragile => Decimal::new(18, 1),
    }
}

fn packaging_factor(fragility: Fragility) -> Decimal {
    match fragility {
        Fragility::Standard => Decimal::ONE,
        Fragility::Fragile => Decimal::new(12, 1),
        Fragility::HighValue => Decimal::new(14, 1),
        Fragility::ExtremelyFragile => Decimal::new(16, 1),
    }
}

fn insurance_adjustment(fragility: Fragility) -> Decimal {
    match fragility {
        Fragility::Standard => Decimal::ONE,
        Fragility::Fragile => Decimal::new(13, 1),
        Fragility::HighValue => Decimal::new(15, 1),
        Fragility::ExtremelyFragile => Decimal::new(17, 1),
    }
}

fn handling_premium(fragility: Fragility) -> Decimal {
    match fragility {
        Fragility::Standard => Decimal::ZERO,
        Fragility::Fragile => Decimal::from(50),
        Fragility::HighValue => Decimal::from(100),
        Fragility::ExtremelyFragile => Decimal::from(150),
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Freight priced on billable weight with a flat 18% fuel surcharge.
pub fn shipping_rate(
    measurements: &Measurements,
    origin: &str,
    destination: &str,
    fragility: Fragility,
) -> ShippingRate {
    let dimensional_weight = measurements.cubic_inches() / Decimal::from(DIM_FACTOR);
    let billable_weight = measurements.weight_lbs.max(dimensional_weight);
    let distance = distance_factor(origin, destination);
    let multiplier = shipping_multiplier(fragility);

    let base_freight = billable_weight * Decimal::new(150, 2) * distance * multiplier;
    let fuel_rate = Decimal::new(18, 2);
    let fuel_surcharge = base_freight * fuel_rate;
    let fragile_handling = if fragility == Fragility::Standard {
        Decimal::ZERO
    } else {
        Decimal::from(50).max(billable_weight * Decimal::new(15, 2))
    };

    ShippingRate {
        base_freight_cost: round2(base_freight),
        fuel_surcharge: round2(fuel_surcharge),
        fragile_handling_fee: round2(fragile_handling),
        total_transportation_cost: round2(base_freight + fuel_surcharge + fragile_handling),
        billable_weight: round2(billable_weight),
        dimensional_weight: round2(dimensional_weight),
        distance_factor: distance,
        fragility_multiplier: multiplier,
        fuel_rate,
    }
}

/// Shipping with the regional fuel rate applied to the rounded base freight.
pub fn enhanced_shipping_rate(
    measurements: &Measurements,
    origin: &str,
    destination: &str,
    fragility: Fragility,
) -> ShippingRate {
    let base = shipping_rate(measurements, origin, destination, fragility);
    let fuel_rate = regional_fuel_rate(origin, destination);
    let fuel_surcharge = base.base_freight_cost * fuel_rate;
    let total = base.base_freight_cost + fuel_surcharge + base.fragile_handling_fee;

    ShippingRate {
        fuel_surcharge: round2(fuel_surcharge),
        total_transportation_cost: round2(total),
        fuel_rate,
        ..base
    }
}

fn packaging_complexity(item_description: &str, fragility: Fragility) -> Decimal {
    const COMPLEX_ITEMS: [&str; 7] =
        ["electronics", "machinery", "artwork", "glass", "computer", "printer", "medical"];

    let description = item_description.to_lowercase();
    let mut complexity = Decimal::ONE;
    if contains_any(&description, &COMPLEX_ITEMS) {
        complexity += Decimal::new(3, 1);
    }
    (complexity * packaging_factor(fragility)).min(Decimal::new(25, 1))
}

pub fn packaging_cost(
    measurements: &Measurements,
    fragility: Fragility,
    item_description: &str,
) -> PackagingCost {
    let volume = measurements.cubic_feet();
    let complexity = packaging_complexity(item_description, fragility);

    // wood 20 + foam 10 + protective 7 per cubic foot
    let materials = volume * Decimal::from(37) * complexity;
    let labor_hours = Decimal::ONE.max(volume * Decimal::new(5, 1) * complexity);
    let labor_rate = Decimal::from(45);
    let labor = labor_hours * labor_rate;

    let description = item_description.to_lowercase();
    let mut special = Decimal::ZERO;
    if description.contains("electronic") {
        special += Decimal::from(50);
    }
    if fragility.needs_extra_protection() {
        special += volume * Decimal::from(15);
    }

    PackagingCost {
        materials_fabrication: round2(materials),
        assembly_labor: round2(labor),
        special_requirements: round2(special),
        total_packaging_cost: round2(materials + labor + special),
        volume_cubic_feet: round2(volume),
        complexity_factor: complexity,
        estimated_labor_hours: labor_hours.round_dp(1),
        labor_rate,
    }
}

/// Packaging with labor re-priced at the origin's regional rate.
pub fn enhanced_packaging_cost(
    measurements: &Measurements,
    fragility: Fragility,
    item_description: &str,
    origin: &str,
) -> PackagingCost {
    let base = packaging_cost(measurements, fragility, item_description);
    let labor_rate = regional_labor_rate(origin);
    let labor = base.estimated_labor_hours * labor_rate;
    let total = base.materials_fabrication + labor + base.special_requirements;

    PackagingCost {
        assembly_labor: round2(labor),
        total_packaging_cost: round2(total),
        labor_rate,
        ..base
    }
}

fn estimated_item_value(item_description: &str, weight_lbs: Decimal) -> Decimal {
    const VALUE_PER_LB: [(&str, i64); 7] = [
        ("electronics", 50),
        ("computer", 80),
        ("printer", 40),
        ("machinery", 30),
        ("industrial", 25),
        ("artwork", 100),
        ("medical", 150),
    ];

    let description = item_description.to_lowercase();
    let per_lb = VALUE_PER_LB
        .iter()
        .find(|(category, _)| description.contains(category))
        .map(|(_, value)| *value)
        .unwrap_or(20);
    weight_lbs * Decimal::from(per_lb)
}

fn declared_value(raw: Option<&str>, item_description: &str, weight_lbs: Decimal) -> Decimal {
    let Some(raw) = raw else {
        return Decimal::from(DEFAULT_DECLARED_VALUE);
    };
    let cleaned = raw.replace(['$', ','], "");
    Decimal::from_str(cleaned.trim())
        .ok()
        .filter(|value| *value > Decimal::ZERO)
        .unwrap_or_else(|| estimated_item_value(item_description, weight_lbs))
}

pub fn insurance_cost(
    item_description: &str,
    weight_lbs: Decimal,
    fragility: Fragility,
    declared: Option<&str>,
) -> InsuranceCost {
    let value = declared_value(declared, item_description, weight_lbs);
    let rate = Decimal::new(15, 3) * insurance_adjustment(fragility);
    let coverage = value * rate;

    let description = item_description.to_lowercase();
    let mut documentation = Decimal::from(35);
    if contains_any(&description, &["electronics", "medical", "industrial"]) {
        documentation += Decimal::from(25);
    }
    if description.contains("international") {
        documentation += Decimal::from(40);
    }

    InsuranceCost {
        insurance_coverage: round2(coverage),
        documentation_permits: round2(documentation),
        total_insurance_documentation: round2(coverage + documentation),
        declared_value: value,
        insurance_rate_percent: round2(rate * Decimal::ONE_HUNDRED),
    }
}

fn loading_cost(weight_lbs: Decimal) -> Decimal {
    if weight_lbs <= Decimal::from(50) {
        Decimal::from(75)
    } else if weight_lbs <= Decimal::from(200) {
        Decimal::from(125)
    } else if weight_lbs <= Decimal::from(500) {
        Decimal::from(200)
    } else {
        Decimal::from(300) + (weight_lbs - Decimal::from(500)) * Decimal::new(25, 2)
    }
}

fn requirements_surcharge(special_requirements: &str) -> Decimal {
    let requirements = special_requirements.to_lowercase();
    let mut surcharge = Decimal::ZERO;
    if contains_any(&requirements, &["climate", "temperature", "humidity"]) {
        surcharge += Decimal::from(75);
    }
    if contains_any(&requirements, &["upright", "orientation", "this side up"]) {
        surcharge += Decimal::from(50);
    }
    if contains_any(&requirements, &["expedited", "rush", "urgent"]) {
        surcharge += Decimal::from(100);
    }
    if contains_any(&requirements, &["white glove", "inside delivery"]) {
        surcharge += Decimal::from(150);
    }
    surcharge
}

pub fn special_handling_cost(
    measurements: &Measurements,
    fragility: Fragility,
    special_requirements: &str,
) -> SpecialHandlingCost {
    let weight = measurements.weight_lbs;
    let premium = handling_premium(fragility);
    let surcharge = requirements_surcharge(special_requirements);

    let mut coordination = Decimal::from(60);
    if measurements.cubic_feet() > Decimal::TEN || weight > Decimal::from(200) {
        coordination += Decimal::from(25);
    }

    let loading = loading_cost(weight) + premium;
    let coordination = coordination + surcharge;

    SpecialHandlingCost {
        loading_unloading_service: round2(loading),
        coordination_tracking: round2(coordination),
        total_special_handling: round2(loading + coordination),
        fragility_premium: premium,
        special_requirements_cost: surcharge,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        enhanced_packaging_cost, enhanced_shipping_rate, insurance_cost, packaging_cost,
        shipping_rate, special_handling_cost,
    };
    use crate::domain::shipment::{Fragility, Measurements};

    fn measurements(l: i64, w: i64, h: i64, weight: i64) -> Measurements {
        Measurements {
            length_in: Decimal::from(l),
            width_in: Decimal::from(w),
            height_in: Decimal::from(h),
            weight_lbs: Decimal::from(weight),
        }
    }

    #[test]
    fn shipping_uses_actual_weight_when_heavier_than_dimensional() {
        let rate = shipping_rate(
            &measurements(48, 36, 24, 350),
            "San Jose, CA",
            "Austin, TX",
            Fragility::Standard,
        );

        assert_eq!(rate.dimensional_weight, Decimal::new(29836, 2));
        assert_eq!(rate.billable_weight, Decimal::from(350));
        assert_eq!(rate.base_freight_cost, Decimal::from(630));
        assert_eq!(rate.fuel_surcharge, Decimal::new(11340, 2));
        assert_eq!(rate.fragile_handling_fee, Decimal::ZERO);
        assert_eq!(rate.total_transportation_cost, Decimal::new(74340, 2));
    }

    #[test]
    fn fragile_shipments_pay_a_minimum_handling_fee() {
        let rate =
            shipping_rate(&measurements(10, 10, 10, 20), "Boise", "Boise", Fragility::Fragile);

        // billable weight 20 lbs -> 20 * 0.15 = 3, floored at 50
        assert_eq!(rate.fragile_handling_fee, Decimal::from(50));
        assert_eq!(rate.base_freight_cost, Decimal::from(39));
    }

    #[test]
    fn enhanced_shipping_applies_regional_fuel_rate() {
        let rate = enhanced_shipping_rate(
            &measurements(48, 36, 24, 350),
            "San Jose, CA",
            "Austin, TX",
            Fragility::Standard,
        );

        assert_eq!(rate.fuel_rate, Decimal::new(189, 3));
        assert_eq!(rate.fuel_surcharge, Decimal::new(11907, 2));
        assert_eq!(rate.total_transportation_cost, Decimal::new(74907, 2));
    }

    #[test]
    fn packaging_scales_with_volume_and_complexity() {
        let cost = packaging_cost(
            &measurements(48, 36, 24, 350),
            Fragility::Standard,
            "Industrial printer",
        );

        // 24 cu ft, complexity 1.3 (printer)
        assert_eq!(cost.volume_cubic_feet, Decimal::from(24));
        assert_eq!(cost.complexity_factor, Decimal::new(13, 1));
        assert_eq!(cost.materials_fabrication, Decimal::new(115440, 2));
        assert_eq!(cost.estimated_labor_hours, Decimal::new(156, 1));
        assert_eq!(cost.assembly_labor, Decimal::from(702));
        assert_eq!(cost.special_requirements, Decimal::ZERO);
        assert_eq!(cost.total_packaging_cost, Decimal::new(185640, 2));
    }

    #[test]
    fn enhanced_packaging_uses_regional_labor() {
        let cost = enhanced_packaging_cost(
            &measurements(48, 36, 24, 350),
            Fragility::Standard,
            "Industrial printer",
            "San Jose, CA",
        );

        assert_eq!(cost.labor_rate, Decimal::from(52));
        assert_eq!(cost.assembly_labor, Decimal::new(81120, 2));
        assert_eq!(cost.total_packaging_cost, Decimal::new(196560, 2));
    }

    #[test]
    fn complexity_is_capped() {
        let cost = packaging_cost(
            &measurements(12, 12, 12, 10),
            Fragility::ExtremelyFragile,
            "glass electronics",
        );
        // (1.0 + 0.3) * 1.6 = 2.08, below the 2.5 cap
        assert_eq!(cost.complexity_factor, Decimal::new(208, 2));
        // electronics + extra protection on 1 cu ft
        assert_eq!(cost.special_requirements, Decimal::from(65));
    }

    #[test]
    fn insurance_defaults_to_five_thousand_declared() {
        let cost =
            insurance_cost("Industrial printer", Decimal::from(350), Fragility::Standard, None);

        assert_eq!(cost.declared_value, Decimal::from(5000));
        assert_eq!(cost.insurance_coverage, Decimal::from(75));
        assert_eq!(cost.documentation_permits, Decimal::from(60));
        assert_eq!(cost.total_insurance_documentation, Decimal::from(135));
        assert_eq!(cost.insurance_rate_percent, Decimal::new(150, 2));
    }

    #[test]
    fn unparseable_declared_value_is_estimated_from_weight() {
        let cost = insurance_cost(
            "Medical imaging unit",
            Decimal::from(100),
            Fragility::Fragile,
            Some("priceless"),
        );

        assert_eq!(cost.declared_value, Decimal::from(15000));
        // 15000 * 0.015 * 1.3
        assert_eq!(cost.insurance_coverage, Decimal::new(29250, 2));
    }

    #[test]
    fn declared_value_strips_currency_formatting() {
        let cost =
            insurance_cost("Sculpture", Decimal::from(10), Fragility::Standard, Some("$12,000"));
        assert_eq!(cost.declared_value, Decimal::from(12000));
    }

    #[test]
    fn special_handling_adds_requirement_surcharges() {
        let cost = special_handling_cost(
            &measurements(48, 36, 24, 350),
            Fragility::HighValue,
            "Climate controlled, keep upright, white glove",
        );

        assert_eq!(cost.loading_unloading_service, Decimal::from(300));
        assert_eq!(cost.special_requirements_cost, Decimal::from(275));
        assert_eq!(cost.coordination_tracking, Decimal::from(360));
        assert_eq!(cost.total_special_handling, Decimal::from(660));
    }

    #[test]
    fn heavy_loads_scale_loading_cost() {
        let cost = special_handling_cost(&measurements(10, 10, 10, 900), Fragility::Standard, "");
        // 300 + 400 * 0.25
        assert_eq!(cost.loading_unloading_service, Decimal::from(400));
        assert_eq!(cost.coordination_tracking, Decimal::from(85));
    }
}
