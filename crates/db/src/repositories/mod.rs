use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use transpak_core::domain::history::{ActionCount, QuoteHistoryEntry};
use transpak_core::domain::quote::{AgentResults, Quote, QuoteId, QuoteStatus};
use transpak_core::domain::shipment::{Shipment, ShipmentId, ValidatedShipment};
use transpak_core::domain::user::{User, UserId};

pub mod history;
pub mod ledger;
pub mod memory;
pub mod quote;
pub mod shipment;
pub mod user;

pub use history::SqlQuoteHistoryRepository;
pub use ledger::{QuoteDraft, RecordedQuote, SqlQuoteLedger};
pub use memory::{
    InMemoryQuoteHistoryRepository, InMemoryQuoteRepository, InMemoryShipmentRepository,
    InMemoryUserRepository,
};
pub use quote::SqlQuoteRepository;
pub use shipment::SqlShipmentRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Unique-constraint failures become `Conflict`; everything else stays a database error.
    pub(crate) fn from_write(error: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
        }
        Self::Database(error)
    }
}

/// Quote fields supplied by the caller; id, status and timestamps are assigned on insert.
#[derive(Clone, Debug, PartialEq)]
pub struct NewQuote {
    pub shipment_id: ShipmentId,
    pub reference: String,
    pub quote_content: String,
    pub agent_results: AgentResults,
    pub total_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotePage {
    pub items: Vec<Quote>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

impl QuotePage {
    pub fn new(items: Vec<Quote>, page: u32, per_page: u32, total: i64) -> Self {
        let per_page = per_page.max(1);
        let pages = u32::try_from((total.max(0) as u64).div_ceil(u64::from(per_page)))
            .unwrap_or(u32::MAX);
        Self { items, page, per_page, total, pages, has_prev: page > 1, has_next: page < pages }
    }

    pub fn prev_num(&self) -> Option<u32> {
        self.has_prev.then(|| self.page - 1)
    }

    pub fn next_num(&self) -> Option<u32> {
        self.has_next.then(|| self.page + 1)
    }
}

#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    async fn create(
        &self,
        shipment: &ValidatedShipment,
        user_id: Option<&UserId>,
    ) -> Result<Shipment, RepositoryError>;
    async fn find_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn create(&self, quote: NewQuote) -> Result<Quote, RepositoryError>;
    async fn find_by_id(&self, id: QuoteId) -> Result<Option<Quote>, RepositoryError>;
    /// Newest first; `page` is 1-based and clamped to at least 1.
    async fn list_page(&self, page: u32, per_page: u32) -> Result<QuotePage, RepositoryError>;
    async fn recent(&self, limit: u32) -> Result<Vec<Quote>, RepositoryError>;
    /// Moves a quote from `from` to `to` only if it is still in `from`. Returns false when no
    /// quote has the given id and `Conflict` when its status has already moved on.
    async fn update_status(
        &self,
        id: QuoteId,
        from: QuoteStatus,
        to: QuoteStatus,
    ) -> Result<bool, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait QuoteHistoryRepository: Send + Sync {
    async fn append(&self, entry: QuoteHistoryEntry) -> Result<(), RepositoryError>;
    async fn list_for_quote(
        &self,
        quote_id: QuoteId,
    ) -> Result<Vec<QuoteHistoryEntry>, RepositoryError>;
    async fn action_counts(&self) -> Result<Vec<ActionCount>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_api_key_digest(&self, digest: &str) -> Result<Option<User>, RepositoryError>;
    async fn touch_last_login(&self, id: &UserId, at: DateTime<Utc>)
        -> Result<(), RepositoryError>;
}

/// Current time at the millisecond precision timestamps are stored with.
pub(crate) fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("timestamp `{raw}`: {error}")))
}

pub(crate) fn status_conflict(id: QuoteId, current: QuoteStatus) -> RepositoryError {
    RepositoryError::Conflict(format!("quote {id} is already {}", current.as_str()))
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
