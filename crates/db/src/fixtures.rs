use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::Row;

use transpak_core::domain::quote::{AgentResults, QuoteId};
use transpak_core::domain::shipment::{ShipmentId, ShipmentRequest};
use transpak_core::quote::QuoteGenerator;

use crate::repositories::{
    decode_error, QuoteDraft, RecordedQuote, RepositoryError, SqlQuoteLedger,
};
use crate::DbPool;

struct DemoShipment {
    item_description: &'static str,
    dimensions: &'static str,
    weight: &'static str,
    origin: &'static str,
    destination: &'static str,
    fragility: &'static str,
    special_requirements: &'static str,
    timeline: &'static str,
}

const DEMO_SHIPMENTS: &[DemoShipment] = &[
    DemoShipment {
        item_description: "Industrial printer",
        dimensions: "48x36x24",
        weight: "350 lbs",
        origin: "San Jose, CA",
        destination: "Austin, TX",
        fragility: "Standard",
        special_requirements: "",
        timeline: "Within 2 weeks",
    },
    DemoShipment {
        item_description: "Medical imaging equipment",
        dimensions: "60x40x48",
        weight: "800 lbs",
        origin: "Los Angeles, CA",
        destination: "New York, NY",
        fragility: "High Value",
        special_requirements: "Climate controlled, white glove delivery",
        timeline: "Expedited",
    },
    DemoShipment {
        item_description: "Glass artwork installation",
        dimensions: "72 x 12 x 48 inches",
        weight: "150 lbs",
        origin: "Seattle, WA",
        destination: "Miami, FL",
        fragility: "Extremely Fragile",
        special_requirements: "This side up",
        timeline: "",
    },
];

/// Quotes in the demo dataset are generated as of this instant so references are stable.
fn demo_generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).single().unwrap_or_else(Utc::now)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeededQuote {
    pub reference: String,
    pub shipment_id: ShipmentId,
    pub quote_id: QuoteId,
    pub total_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeedResult {
    pub quotes: Vec<SeededQuote>,
    pub quote_ids: Vec<QuoteId>,
    pub skipped: usize,
}

/// Three deterministic shipments with generated quotes for demos and smoke tests.
pub struct DemoDataset;

impl DemoDataset {
    pub fn requests() -> Vec<ShipmentRequest> {
        DEMO_SHIPMENTS
            .iter()
            .map(|demo| ShipmentRequest {
                item_description: demo.item_description.to_string(),
                dimensions: demo.dimensions.to_string(),
                weight: demo.weight.to_string(),
                origin: demo.origin.to_string(),
                destination: demo.destination.to_string(),
                fragility: demo.fragility.to_string(),
                special_requirements: demo.special_requirements.to_string(),
                timeline: demo.timeline.to_string(),
                declared_value: None,
            })
            .collect()
    }

    /// Loads the dataset; quotes whose reference already exists are left alone.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let ledger = SqlQuoteLedger::new(pool.clone());
        let generator: QuoteGenerator = QuoteGenerator::default();

        let mut result = SeedResult { quotes: Vec::new(), quote_ids: Vec::new(), skipped: 0 };
        for request in Self::requests() {
            let validated = request
                .validate()
                .map_err(|error| RepositoryError::Decode(format!("demo shipment: {error}")))?;
            let generated = generator.generate_at(&validated, demo_generated_at(), None);

            if let Some(existing) = existing_quote(pool, &generated.reference).await? {
                result.quote_ids.push(existing);
                result.skipped += 1;
                continue;
            }

            let draft = QuoteDraft {
                reference: generated.reference.clone(),
                quote_content: generated.quote_content,
                total_cost: generated.cost_breakdown.total,
                agent_results: AgentResults {
                    agent_activity: generated.agent_activity,
                    cost_breakdown: generated.cost_breakdown,
                },
            };
            let info = BTreeMap::from([("source".to_string(), "demo_seed".to_string())]);
            let RecordedQuote { shipment, quote, .. } =
                ledger.record(&validated, None, draft, info).await?;

            result.quote_ids.push(quote.id);
            result.quotes.push(SeededQuote {
                reference: quote.reference,
                shipment_id: shipment.id,
                quote_id: quote.id,
                total_cost: quote.total_cost,
            });
        }

        Ok(result)
    }
}

async fn existing_quote(
    pool: &DbPool,
    reference: &str,
) -> Result<Option<QuoteId>, RepositoryError> {
    let row = sqlx::query("SELECT id FROM quotes WHERE reference = ? ORDER BY id LIMIT 1")
        .bind(reference)
        .fetch_optional(pool)
        .await?;

    row.map(|row| row.try_get::<i64, _>("id").map(QuoteId).map_err(decode_error)).transpose()
}
