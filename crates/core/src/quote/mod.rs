//! Deterministic quote generation.
//!
//! The generator prices a validated shipment, assembles the per-agent activity record and
//! renders the customer-facing document. The numbers produced here are authoritative: any
//! narrative layered on top by the agent crew must not change them.

pub mod activity;
pub mod analysis;
pub mod document;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shipment::ValidatedShipment;
use crate::pricing::{CostBreakdown, EnhancedPricingEngine, PricingEngine, PricingTrace};

pub use activity::{
    AgentActivity, CRATING_DESIGN_AGENT, LOGISTICS_PLANNER_AGENT, QUOTE_CONSOLIDATOR_AGENT,
    SALES_BRIEFING_AGENT,
};
pub use analysis::{analyze_quote, QuoteAnalysis, ShipmentFacts};
pub use document::{cost_block, render_quote_document};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Analysis,
    Validation,
    Design,
    Calculation,
    Routing,
    Consolidation,
    Completion,
    Error,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Validation => "validation",
            Self::Design => "design",
            Self::Calculation => "calculation",
            Self::Routing => "routing",
            Self::Consolidation => "consolidation",
            Self::Completion => "completion",
            Self::Error => "error",
        }
    }
}

/// Receives progress updates while a quote is being produced.
pub trait ActivitySink: Send + Sync {
    fn log_activity(
        &self,
        session_id: &str,
        agent: &str,
        activity: &str,
        kind: ActivityKind,
        progress: u8,
    );
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuote {
    pub reference: String,
    pub quote_content: String,
    pub agent_activity: AgentActivity,
    pub cost_breakdown: CostBreakdown,
    pub trace: PricingTrace,
    pub generated_at: DateTime<Utc>,
}

pub struct Progress<'a> {
    pub sink: &'a dyn ActivitySink,
    pub session_id: &'a str,
}

impl Progress<'_> {
    fn emit(&self, agent: &str, activity: &str, kind: ActivityKind, progress: u8) {
        self.sink.log_activity(self.session_id, agent, activity, kind, progress);
    }
}

#[derive(Clone, Debug, Default)]
pub struct QuoteGenerator<P = EnhancedPricingEngine> {
    pricing: P,
}

impl<P: PricingEngine> QuoteGenerator<P> {
    pub fn new(pricing: P) -> Self {
        Self { pricing }
    }

    pub fn generate(&self, shipment: &ValidatedShipment) -> GeneratedQuote {
        self.generate_at(shipment, Utc::now(), None)
    }

    pub fn generate_with_progress(
        &self,
        shipment: &ValidatedShipment,
        progress: Progress<'_>,
    ) -> GeneratedQuote {
        self.generate_at(shipment, Utc::now(), Some(progress))
    }

    pub fn generate_at(
        &self,
        shipment: &ValidatedShipment,
        at: DateTime<Utc>,
        progress: Option<Progress<'_>>,
    ) -> GeneratedQuote {
        let emit = |agent: &str, activity: &str, kind: ActivityKind, pct: u8| {
            if let Some(progress) = progress.as_ref() {
                progress.emit(agent, activity, kind, pct);
            }
        };

        emit(SALES_BRIEFING_AGENT, "Analyzing shipment requirements", ActivityKind::Analysis, 20);
        emit(
            SALES_BRIEFING_AGENT,
            &format!(
                "Validated {} from {} to {}",
                shipment.item_description, shipment.origin, shipment.destination
            ),
            ActivityKind::Validation,
            30,
        );
        emit(
            CRATING_DESIGN_AGENT,
            &format!("Designing crate for {} fragility", shipment.fragility),
            ActivityKind::Design,
            50,
        );

        let priced = self.pricing.price(shipment, at);

        emit(
            CRATING_DESIGN_AGENT,
            &format!(
                "Packaging cost calculated: {}",
                crate::pricing::format_usd(priced.breakdown.packaging_crating)
            ),
            ActivityKind::Calculation,
            60,
        );
        emit(
            LOGISTICS_PLANNER_AGENT,
            &format!(
                "Route planned: {} miles, {} days",
                priced.route.distance_miles, priced.route.estimated_transit_days
            ),
            ActivityKind::Routing,
            75,
        );

        let agent_activity = AgentActivity::from_pricing(shipment, &priced);
        let reference = quote_reference(shipment, at);

        emit(
            QUOTE_CONSOLIDATOR_AGENT,
            &format!(
                "Consolidated quote total: {}",
                crate::pricing::format_usd(priced.breakdown.total)
            ),
            ActivityKind::Consolidation,
            90,
        );

        let quote_content = render_quote_document(shipment, &priced.breakdown, &reference, at);

        emit(
            QUOTE_CONSOLIDATOR_AGENT,
            &format!("Quote {reference} ready"),
            ActivityKind::Completion,
            100,
        );

        GeneratedQuote {
            reference,
            quote_content,
            agent_activity,
            cost_breakdown: priced.breakdown,
            trace: priced.trace,
            generated_at: at,
        }
    }
}

/// `TPK-YYYYMMDD-NNNN`, with NNNN taken from a hash of the shipment fields.
pub fn quote_reference(shipment: &ValidatedShipment, at: DateTime<Utc>) -> String {
    let mut hasher = blake3::Hasher::new();
    for field in [
        shipment.item_description.as_str(),
        shipment.dimensions.as_str(),
        shipment.weight.as_str(),
        shipment.origin.as_str(),
        shipment.destination.as_str(),
        shipment.fragility.label(),
        shipment.special_requirements.as_str(),
        shipment.timeline.as_str(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update(b"|");
    }
    let digest = hasher.finalize();
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    let suffix = u64::from_le_bytes(prefix) % 10_000;

    format!("TPK-{}-{suffix:04}", at.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{ActivityKind, ActivitySink, Progress, QuoteGenerator};
    use crate::domain::shipment::{ShipmentRequest, ValidatedShipment};

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, ActivityKind, u8)>>,
    }

    impl ActivitySink for RecordingSink {
        fn log_activity(
            &self,
            _session_id: &str,
            agent: &str,
            _activity: &str,
            kind: ActivityKind,
            progress: u8,
        ) {
            if let Ok(mut events) = self.events.lock() {
                events.push((agent.to_string(), kind, progress));
            }
        }
    }

    fn shipment() -> ValidatedShipment {
        ShipmentRequest {
            item_description: "Industrial printer".to_string(),
            dimensions: "48x36x24".to_string(),
            weight: "350 lbs".to_string(),
            origin: "San Jose, CA".to_string(),
            destination: "Austin, TX".to_string(),
            fragility: "Standard".to_string(),
            ..ShipmentRequest::default()
        }
        .validate()
        .expect("valid shipment")
    }

    #[test]
    fn document_contains_reference_totals_and_rates() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("valid date");
        let generated = <QuoteGenerator>::default().generate_at(&shipment(), at, None);

        assert!(generated.reference.starts_with("TPK-20260314-"));
        assert_eq!(generated.reference.len(), "TPK-20260314-0000".len());

        let content = &generated.quote_content;
        assert!(content.starts_with("TRANSPAK LOGISTICS SOLUTIONS\nCOMPREHENSIVE SHIPPING QUOTE"));
        assert!(content.contains("Date: March 14, 2026"));
        assert!(content.contains(&format!("Quote Reference: {}", generated.reference)));
        assert!(content.contains("Weight: 350 lbs\n"));
        assert!(content.contains("Transportation: $749.07"));
        assert!(content.contains("TOTAL QUOTE: $3,134.67"));
        assert!(content.contains("QUOTE VALIDITY: 30 days from quote date"));
        assert!(content.contains("- Regional fuel surcharge: 0.189"));
        assert!(content.contains("- Local labor rates: $52/hour"));
    }

    #[test]
    fn reference_is_stable_for_identical_shipments() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).single().expect("valid date");
        let first = super::quote_reference(&shipment(), at);
        let second = super::quote_reference(&shipment(), at);
        assert_eq!(first, second);

        let mut other = shipment();
        other.destination = "Miami, FL".to_string();
        let third = super::quote_reference(&other, at);
        assert!(third.starts_with("TPK-20260102-"));
    }

    #[test]
    fn activity_sections_mirror_cost_breakdown() {
        let generated = <QuoteGenerator>::default().generate(&shipment());
        let activity = &generated.agent_activity;

        assert_eq!(
            activity.packaging_engineering.cost_components.total,
            generated.cost_breakdown.packaging_crating
        );
        assert_eq!(
            activity.logistics_planning.cost_components.total,
            generated.cost_breakdown.transportation
        );
        assert_eq!(activity.quote_consolidation.confidence_score, Decimal::new(95, 2));
        assert_eq!(activity.sales_briefing.analysis.len(), 5);
        assert!(activity.logistics_planning.carrier_analysis.contains("FedEx: 96.0% on-time"));
    }

    #[test]
    fn progress_is_reported_in_pipeline_order() {
        let sink = RecordingSink::default();
        <QuoteGenerator>::default()
            .generate_with_progress(&shipment(), Progress { sink: &sink, session_id: "s-1" });

        let events = sink.events.lock().expect("lock").clone();
        let percents: Vec<u8> = events.iter().map(|(_, _, pct)| *pct).collect();
        assert_eq!(percents, vec![20, 30, 50, 60, 75, 90, 100]);
        assert_eq!(events.last().map(|(_, kind, _)| *kind), Some(ActivityKind::Completion));
    }
}
