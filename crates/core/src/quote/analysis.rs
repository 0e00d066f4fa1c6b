//! Review of a finished quote document: which required topics it covers, the prices it
//! states, and a confidence score with suggestions for a sales rep to act on.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shipment::{Fragility, Shipment, ValidatedShipment};
use crate::pricing::{format_usd, CostBreakdown};

pub const REQUIRED_ELEMENTS: [&str; 5] = ["packaging", "shipping", "timeline", "cost", "handling"];

const MISSING_ELEMENT_PENALTY: u8 = 10;
const NO_TOTAL_PENALTY: u8 = 15;
const CONFLICTING_TOTAL_PENALTY: u8 = 30;
const UNBALANCED_PENALTY: u8 = 20;
const UNDECLARED_VALUE_PENALTY: u8 = 10;
const NO_TIMELINE_PENALTY: u8 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub is_complete: bool,
    pub score: u8,
    pub missing_elements: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPricing {
    pub amounts: Vec<Decimal>,
    pub stated_totals: Vec<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceAnalysis {
    pub confidence_score: u8,
    pub completeness_score: u8,
    pub accuracy_indicators: Vec<String>,
    pub risk_factors: Vec<String>,
    pub improvement_suggestions: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAnalysis {
    pub confidence: ConfidenceAnalysis,
    pub completeness: Completeness,
    pub pricing: ExtractedPricing,
}

/// The shipment details the review looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShipmentFacts<'a> {
    pub fragility: Fragility,
    pub declared_value: Option<&'a str>,
    pub timeline: &'a str,
}

impl<'a> From<&'a Shipment> for ShipmentFacts<'a> {
    fn from(shipment: &'a Shipment) -> Self {
        Self {
            fragility: shipment.fragility,
            declared_value: shipment.declared_value.as_deref(),
            timeline: &shipment.timeline,
        }
    }
}

impl<'a> From<&'a ValidatedShipment> for ShipmentFacts<'a> {
    fn from(shipment: &'a ValidatedShipment) -> Self {
        Self {
            fragility: shipment.fragility,
            declared_value: shipment.declared_value.as_deref(),
            timeline: &shipment.timeline,
        }
    }
}

/// Case-insensitive check for each of [`REQUIRED_ELEMENTS`].
pub fn validate_completeness(content: &str) -> Completeness {
    let lower = content.to_lowercase();
    let missing_elements: Vec<String> = REQUIRED_ELEMENTS
        .iter()
        .filter(|element| !lower.contains(*element))
        .map(|element| element.to_string())
        .collect();
    let present = REQUIRED_ELEMENTS.len() - missing_elements.len();

    Completeness {
        is_complete: missing_elements.is_empty(),
        score: (present * 100 / REQUIRED_ELEMENTS.len()) as u8,
        missing_elements,
    }
}

/// Every `$1,234.56` or `USD 1234.56` amount, plus the first amount on each line that
/// mentions a total.
pub fn extract_pricing(content: &str) -> ExtractedPricing {
    let mut pricing = ExtractedPricing::default();
    for line in content.lines() {
        pricing.amounts.extend(amounts_in(line));
        if let Some(at) = line.to_ascii_uppercase().find("TOTAL") {
            pricing.stated_totals.extend(amounts_in(&line[at..]).into_iter().next());
        }
    }
    pricing
}

fn amounts_in(line: &str) -> Vec<Decimal> {
    let upper = line.to_ascii_uppercase();
    line.char_indices()
        .filter_map(|(at, ch)| {
            let after = if ch == '$' {
                &line[at + 1..]
            } else if upper[at..].starts_with("USD") {
                line[at + 3..].trim_start()
            } else {
                return None;
            };
            leading_amount(after)
        })
        .collect()
}

fn leading_amount(text: &str) -> Option<Decimal> {
    let end = text
        .find(|ch: char| !(ch.is_ascii_digit() || ch == ',' || ch == '.'))
        .unwrap_or(text.len());
    let raw = text[..end].trim_end_matches(['.', ',']);
    if !raw.starts_with(|ch: char| ch.is_ascii_digit()) {
        return None;
    }
    raw.replace(',', "").parse().ok()
}

/// Fixed advice below 80, 70 and 60 points, followed by `additional`; duplicates are
/// dropped and first occurrences keep their place.
pub fn suggest_improvements(confidence_score: u8, additional: &[String]) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    let tiers: [(u8, &[&str]); 3] = [
        (80, &["Consider adding more detailed cost breakdown"]),
        (
            70,
            &["Include specific timeline milestones", "Add insurance and liability information"],
        ),
        (
            60,
            &[
                "Provide more detailed packaging specifications",
                "Include contingency planning information",
            ],
        ),
    ];
    let tiered = tiers
        .iter()
        .filter(|(threshold, _)| confidence_score < *threshold)
        .flat_map(|(_, items)| items.iter().map(|item| item.to_string()));

    for suggestion in tiered.chain(additional.iter().cloned()) {
        if !suggestions.contains(&suggestion) {
            suggestions.push(suggestion);
        }
    }
    suggestions
}

pub fn analyze_quote(
    content: &str,
    breakdown: &CostBreakdown,
    shipment: ShipmentFacts<'_>,
) -> QuoteAnalysis {
    let completeness = validate_completeness(content);
    let pricing = extract_pricing(content);

    let mut score: u8 = 100;
    let mut indicators = Vec::new();
    let mut risks = Vec::new();
    let mut additional = Vec::new();
    let mut deduct = |points: u8| score = score.saturating_sub(points);

    for element in &completeness.missing_elements {
        deduct(MISSING_ELEMENT_PENALTY);
        additional.push(format!("Describe the {element} in the quote document"));
    }

    let total = breakdown.total.round_dp(2);
    let conflicting: Vec<Decimal> = pricing
        .stated_totals
        .iter()
        .copied()
        .filter(|stated| stated.round_dp(2) != total)
        .collect();
    if pricing.stated_totals.is_empty() {
        deduct(NO_TOTAL_PENALTY);
        risks.push("The quote does not state a total".to_string());
        additional.push("State the total cost explicitly".to_string());
    } else if conflicting.is_empty() {
        indicators.push(format!("Stated total matches the priced total {}", format_usd(total)));
    } else {
        deduct(CONFLICTING_TOTAL_PENALTY);
        for stated in conflicting {
            risks.push(format!(
                "Stated total {} differs from the priced total {}",
                format_usd(stated),
                format_usd(total)
            ));
        }
    }

    if breakdown.component_sum().round_dp(2) == total {
        indicators.push("Cost components add up to the total".to_string());
    } else {
        deduct(UNBALANCED_PENALTY);
        risks.push("Cost components do not add up to the total".to_string());
    }

    let sensitive =
        matches!(shipment.fragility, Fragility::HighValue | Fragility::ExtremelyFragile);
    let undeclared = shipment.declared_value.map_or(true, |value| value.trim().is_empty());
    if sensitive && undeclared {
        deduct(UNDECLARED_VALUE_PENALTY);
        risks.push(format!("{} shipment has no declared value", shipment.fragility.label()));
        additional.push("Ask the customer for a declared value to size insurance".to_string());
    }

    if shipment.timeline.trim().is_empty() {
        deduct(NO_TIMELINE_PENALTY);
        risks.push("No delivery timeline was requested".to_string());
        additional.push("Confirm the delivery timeline with the customer".to_string());
    }

    QuoteAnalysis {
        confidence: ConfidenceAnalysis {
            confidence_score: score,
            completeness_score: completeness.score,
            accuracy_indicators: indicators,
            risk_factors: risks,
            improvement_suggestions: suggest_improvements(score, &additional),
            analyzed_at: Utc::now(),
        },
        completeness,
        pricing,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        analyze_quote, extract_pricing, suggest_improvements, validate_completeness,
        ShipmentFacts,
    };
    use crate::domain::shipment::{ShipmentRequest, ValidatedShipment};
    use crate::quote::QuoteGenerator;

    fn shipment(fragility: &str, timeline: &str) -> ValidatedShipment {
        ShipmentRequest {
            item_description: "Industrial printer".to_string(),
            dimensions: "48x36x24".to_string(),
            weight: "350 lbs".to_string(),
            origin: "San Jose, CA".to_string(),
            destination: "Austin, TX".to_string(),
            fragility: fragility.to_string(),
            timeline: timeline.to_string(),
            ..ShipmentRequest::default()
        }
        .validate()
        .expect("valid")
    }

    #[test]
    fn completeness_lists_missing_topics_in_order() {
        let partial = validate_completeness("Crate PACKAGING and Shipping by truck.");
        assert!(!partial.is_complete);
        assert_eq!(partial.score, 40);
        assert_eq!(partial.missing_elements, vec!["timeline", "cost", "handling"]);

        let full = validate_completeness("packaging shipping timeline cost handling");
        assert!(full.is_complete);
        assert_eq!(full.score, 100);
    }

    #[test]
    fn prices_are_read_from_dollar_and_usd_amounts() {
        let content = "Crating: $1,200.50\nFreight USD 980\nTOTAL QUOTE: $2,180.50.\nNote: $ only";
        let pricing = extract_pricing(content);

        assert_eq!(
            pricing.amounts,
            vec![Decimal::new(120050, 2), Decimal::from(980), Decimal::new(218050, 2)]
        );
        assert_eq!(pricing.stated_totals, vec![Decimal::new(218050, 2)]);
    }

    #[test]
    fn suggestions_accumulate_by_tier_without_duplicates() {
        assert!(suggest_improvements(90, &[]).is_empty());
        assert_eq!(suggest_improvements(75, &[]).len(), 1);

        let extra = vec![
            "Include contingency planning information".to_string(),
            "Call the customer".to_string(),
        ];
        let low = suggest_improvements(55, &extra);
        assert_eq!(low.len(), 6);
        assert_eq!(low[0], "Consider adding more detailed cost breakdown");
        assert_eq!(low[5], "Call the customer");
    }

    #[test]
    fn generated_quote_with_timeline_scores_full_confidence() {
        let validated = shipment("Standard", "Within two weeks");
        let generated = <QuoteGenerator>::default().generate(&validated);

        let analysis = analyze_quote(
            &generated.quote_content,
            &generated.cost_breakdown,
            ShipmentFacts::from(&validated),
        );
        assert!(analysis.completeness.is_complete);
        let total = generated.cost_breakdown.total.round_dp(2);
        assert_eq!(analysis.pricing.stated_totals, vec![total]);
        assert_eq!(analysis.confidence.confidence_score, 100);
        assert!(analysis.confidence.risk_factors.is_empty());
        assert!(analysis.confidence.improvement_suggestions.is_empty());
    }

    #[test]
    fn edited_total_and_missing_details_lower_confidence() {
        let validated = shipment("Extremely Fragile", "");
        let generated = <QuoteGenerator>::default().generate(&validated);
        let edited = format!("{}\nTOTAL QUOTE: $1.00", generated.quote_content);

        let analysis =
            analyze_quote(&edited, &generated.cost_breakdown, ShipmentFacts::from(&validated));
        let confidence = &analysis.confidence;

        // timeline topic, conflicting total, undeclared value, no timeline
        assert_eq!(confidence.confidence_score, 100 - 10 - 30 - 10 - 5);
        assert_eq!(analysis.completeness.missing_elements, vec!["timeline"]);
        assert_eq!(confidence.risk_factors.len(), 3);
        assert!(confidence.risk_factors[0].starts_with("Stated total $1.00 differs"));
        assert!(confidence
            .improvement_suggestions
            .contains(&"Confirm the delivery timeline with the customer".to_string()));
        assert_eq!(
            confidence.improvement_suggestions[0],
            "Consider adding more detailed cost breakdown"
        );
    }
}
