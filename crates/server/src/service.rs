//! Quote submission shared by the HTML form and the JSON API.

use std::collections::BTreeMap;

use tracing::{info, warn};
use uuid::Uuid;

use transpak_agent::{Narration, NarrativeSource};
use transpak_core::domain::quote::{AgentResults, Quote};
use transpak_core::domain::shipment::{Shipment, ShipmentRequest, ValidatedShipment};
use transpak_core::domain::user::UserId;
use transpak_core::errors::ApplicationError;
use transpak_core::quote::Progress;
use transpak_db::{QuoteDraft, RepositoryError};

use crate::state::AppState;

#[derive(Clone, Debug, Default)]
pub struct QuoteSubmission {
    pub request: ShipmentRequest,
    pub user_id: Option<UserId>,
    /// Monitor session to report progress under; a fresh one is used when absent.
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StoredQuote {
    pub quote: Quote,
    pub shipment: Shipment,
    pub session_id: String,
    pub narrative_source: NarrativeSource,
    pub guardrail: Option<&'static str>,
}

pub fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

/// Validates, prices, narrates and stores one shipment quote. Nothing is written when
/// validation fails.
pub async fn submit_quote(
    state: &AppState,
    submission: QuoteSubmission,
) -> Result<StoredQuote, ApplicationError> {
    let shipment = submission.request.validate()?;
    let session_id = submission.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    state.monitor.start_session(&session_id);

    let mut created_info = BTreeMap::new();
    if let Some(user_agent) = submission.user_agent {
        created_info.insert("user_agent".to_string(), user_agent);
    }
    let result = store_quote(
        state,
        &session_id,
        &shipment,
        submission.user_id.as_ref(),
        created_info,
    )
    .await;
    let (quote, stored_shipment, narration) = match result {
        Ok(stored) => stored,
        Err(error) => {
            state.monitor.fail_session(&session_id, &error.to_string());
            warn!(
                event_name = "quote.generation.failed",
                correlation_id = %session_id,
                error = %error,
                "quote generation failed"
            );
            return Err(error);
        }
    };

    state.monitor.complete_session(&session_id, quote.id);

    info!(
        event_name = "quote.generated",
        correlation_id = %session_id,
        quote_id = %quote.id,
        shipment_id = %stored_shipment.id,
        quote_reference = %quote.reference,
        total_cost = %quote.total_cost,
        narrative_source = narration.source.as_str(),
        "quote generated"
    );

    Ok(StoredQuote {
        quote,
        shipment: stored_shipment,
        session_id,
        narrative_source: narration.source,
        guardrail: narration.guardrail,
    })
}

async fn store_quote(
    state: &AppState,
    session_id: &str,
    shipment: &ValidatedShipment,
    user_id: Option<&UserId>,
    mut created_info: BTreeMap<String, String>,
) -> Result<(Quote, Shipment, Narration), ApplicationError> {
    let generated = state.generator.generate_with_progress(
        shipment,
        Progress { sink: state.monitor.as_ref(), session_id },
    );
    let narration = state.runtime.narrate(shipment, &generated).await;
    created_info.insert("narrative_source".to_string(), narration.source.as_str().to_string());

    let draft = QuoteDraft {
        reference: generated.reference.clone(),
        quote_content: narration.content.clone(),
        total_cost: generated.cost_breakdown.total,
        agent_results: AgentResults {
            agent_activity: generated.agent_activity,
            cost_breakdown: generated.cost_breakdown,
        },
    };
    let recorded = state
        .ledger()
        .record(shipment, user_id, draft, created_info)
        .await
        .map_err(persistence)?;

    Ok((recorded.quote, recorded.shipment, narration))
}
