use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::quote::{QuoteId, QuoteStatus};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteAction {
    Created,
    Viewed,
    Downloaded,
    Accepted,
    Declined,
}

impl QuoteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Viewed => "viewed",
            Self::Downloaded => "downloaded",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    /// History action recorded when a quote moves into `status`.
    pub fn for_status(status: QuoteStatus) -> Self {
        match status {
            QuoteStatus::Generated => Self::Created,
            QuoteStatus::Accepted => Self::Accepted,
            QuoteStatus::Declined => Self::Declined,
        }
    }
}

impl fmt::Display for QuoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created" => Ok(Self::Created),
            "viewed" => Ok(Self::Viewed),
            "downloaded" => Ok(Self::Downloaded),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown quote action `{other}`")))
            }
        }
    }
}

/// One append-only audit record for a quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteHistoryEntry {
    pub id: String,
    pub quote_id: QuoteId,
    pub action: QuoteAction,
    pub timestamp: DateTime<Utc>,
    pub user_info: BTreeMap<String, String>,
}

impl QuoteHistoryEntry {
    pub fn new(quote_id: QuoteId, action: QuoteAction) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            quote_id,
            action,
            timestamp: Utc::now(),
            user_info: BTreeMap::new(),
        }
    }

    pub fn with_user_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_info.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    pub action: QuoteAction,
    pub count: i64,
}
