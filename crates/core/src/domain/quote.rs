use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shipment::ShipmentId;
use crate::errors::DomainError;
use crate::pricing::CostBreakdown;
use crate::quote::AgentActivity;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub i64);

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Generated,
    Accepted,
    Declined,
}

impl QuoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl FromStr for QuoteStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "generated" => Ok(Self::Generated),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown quote status `{other}`")))
            }
        }
    }
}

/// JSON blob persisted alongside each quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResults {
    pub agent_activity: AgentActivity,
    pub cost_breakdown: CostBreakdown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub shipment_id: ShipmentId,
    pub reference: String,
    pub quote_content: String,
    pub agent_results: AgentResults,
    pub status: QuoteStatus,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Generated, QuoteStatus::Accepted)
                | (QuoteStatus::Generated, QuoteStatus::Declined)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            self.updated_at = Utc::now();
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status, to: next })
    }
}
