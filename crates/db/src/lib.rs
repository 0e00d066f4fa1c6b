pub mod analytics;
pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use analytics::{AnalyticsQueries, DailyQuoteCount, ProcessingStats, QuoteAnalytics, RouteCount};
pub use connection::{connect, connect_with_config, connect_with_settings, ping, DbPool};
pub use fixtures::{DemoDataset, SeedResult, SeededQuote};
pub use repositories::{
    InMemoryQuoteHistoryRepository, InMemoryQuoteRepository, InMemoryShipmentRepository,
    InMemoryUserRepository, NewQuote, QuoteDraft, QuoteHistoryRepository, QuotePage,
    QuoteRepository, RecordedQuote, RepositoryError, ShipmentRepository,
    SqlQuoteHistoryRepository, SqlQuoteLedger, SqlQuoteRepository, SqlShipmentRepository,
    SqlUserRepository, UserRepository,
};
