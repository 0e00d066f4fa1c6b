use std::collections::BTreeMap;

use rust_decimal::Decimal;

use transpak_core::domain::history::{QuoteAction, QuoteHistoryEntry};
use transpak_core::domain::quote::{AgentResults, Quote};
use transpak_core::domain::shipment::{Shipment, ShipmentId, ValidatedShipment};
use transpak_core::domain::user::UserId;

use super::history::insert_entry;
use super::quote::insert_quote;
use super::shipment::insert_shipment;
use super::{NewQuote, RepositoryError};
use crate::DbPool;

/// Quote fields known before the shipment row exists.
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteDraft {
    pub reference: String,
    pub quote_content: String,
    pub agent_results: AgentResults,
    pub total_cost: Decimal,
}

impl QuoteDraft {
    fn for_shipment(self, shipment_id: ShipmentId) -> NewQuote {
        NewQuote {
            shipment_id,
            reference: self.reference,
            quote_content: self.quote_content,
            agent_results: self.agent_results,
            total_cost: self.total_cost,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecordedQuote {
    pub shipment: Shipment,
    pub quote: Quote,
    pub created: QuoteHistoryEntry,
}

/// Writes a shipment, its quote and the `created` history entry as one unit.
pub struct SqlQuoteLedger {
    pool: DbPool,
}

impl SqlQuoteLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Either all three rows are committed or none are.
    pub async fn record(
        &self,
        shipment: &ValidatedShipment,
        user_id: Option<&UserId>,
        draft: QuoteDraft,
        created_info: BTreeMap<String, String>,
    ) -> Result<RecordedQuote, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let stored = insert_shipment(&mut *tx, shipment, user_id).await?;
        let quote = insert_quote(&mut *tx, draft.for_shipment(stored.id)).await?;
        let mut created = QuoteHistoryEntry::new(quote.id, QuoteAction::Created);
        created.user_info = created_info;
        insert_entry(&mut *tx, &created).await?;

        tx.commit().await?;
        Ok(RecordedQuote { shipment: stored, quote, created })
    }
}
