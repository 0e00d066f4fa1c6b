use chrono::{DateTime, Utc};

use crate::domain::shipment::ValidatedShipment;
use crate::pricing::{format_usd, CostBreakdown};

const SERVICES_INCLUDED: [&str; 6] = [
    "Custom protective packaging design",
    "Professional crating with premium materials",
    "Door-to-door transportation service",
    "Full insurance coverage and documentation",
    "Real-time tracking and coordination",
    "Specialized handling for fragile items",
];

pub const QUOTE_VALIDITY: &str = "30 days from quote date";
pub const ESTIMATED_TRANSIT: &str = "3-5 business days";

/// The "DETAILED COST BREAKDOWN" block, without surrounding blank lines.
pub fn cost_block(breakdown: &CostBreakdown) -> String {
    [
        "DETAILED COST BREAKDOWN:".to_string(),
        format!("Packaging & Crating: {}", format_usd(breakdown.packaging_crating)),
        format!("Transportation: {}", format_usd(breakdown.transportation)),
        format!("Insurance & Documentation: {}", format_usd(breakdown.insurance_documentation)),
        format!("Special Handling: {}", format_usd(breakdown.special_handling)),
        String::new(),
        format!("TOTAL QUOTE: {}", format_usd(breakdown.total)),
    ]
    .join("\n")
}

pub fn render_quote_document(
    shipment: &ValidatedShipment,
    breakdown: &CostBreakdown,
    reference: &str,
    at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        "TRANSPAK LOGISTICS SOLUTIONS".to_string(),
        "COMPREHENSIVE SHIPPING QUOTE".to_string(),
        String::new(),
        format!("Date: {}", at.format("%B %d, %Y")),
        format!("Quote Reference: {reference}"),
        String::new(),
        "SHIPMENT DETAILS:".to_string(),
        format!("Item Description: {}", shipment.item_description),
        format!("Dimensions: {} inches (L x W x H)", shipment.dimensions),
        format!("Weight: {}", weight_label(&shipment.weight)),
        format!("Origin: {}", shipment.origin),
        format!("Destination: {}", shipment.destination),
        format!("Fragility Level: {}", shipment.fragility),
    ];
    if !shipment.special_requirements.is_empty() {
        lines.push(format!("Special Requirements: {}", shipment.special_requirements));
    }
    if !shipment.timeline.is_empty() {
        lines.push(format!("Timeline: {}", shipment.timeline));
    }

    lines.push(String::new());
    lines.push(cost_block(breakdown));
    lines.push(String::new());
    lines.push("SERVICES INCLUDED:".to_string());
    lines.extend(SERVICES_INCLUDED.iter().map(|service| format!("✓ {service}")));
    lines.push(String::new());
    lines.push(format!("QUOTE VALIDITY: {QUOTE_VALIDITY}"));
    lines.push(format!("ESTIMATED TRANSIT TIME: {ESTIMATED_TRANSIT}"));
    lines.push(String::new());
    lines.push("This quote reflects current market rates including:".to_string());
    lines.push(format!("- Regional fuel surcharge: {:.3}", breakdown.fuel_rate_applied));
    lines.push(format!("- Local labor rates: ${}/hour", breakdown.labor_rate_applied));
    lines.push("- Real-time commodity pricing integration".to_string());
    lines.push(String::new());
    lines.push("Contact us to proceed with this shipment or for any modifications.".to_string());
    lines.push(String::new());
    lines.push("TransPak Logistics Solutions".to_string());
    lines.push("Professional Shipping & Crating Services".to_string());

    lines.join("\n")
}

// Raw weights may already carry a unit ("350 lbs", "150 kg").
fn weight_label(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("lb") || lower.contains("kg") {
        raw.to_string()
    } else {
        format!("{raw} lbs")
    }
}
