use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tera::Tera;

use transpak_agent::{AgentRuntime, LlmClient};
use transpak_core::a2a::{
    A2aProtocol, AgentRegistry, ExternalTransport, ExternalValidators, SkillNegotiator,
    TransPakAgents,
};
use transpak_core::cache::{AgentMetrics, QuoteCache};
use transpak_core::config::AppConfig;
use transpak_core::monitor::ActivityMonitor;
use transpak_core::quote::QuoteGenerator;
use transpak_db::{
    AnalyticsQueries, DbPool, SqlQuoteHistoryRepository, SqlQuoteLedger, SqlQuoteRepository,
    SqlShipmentRepository, SqlUserRepository,
};

use crate::rate_limit::RateLimiter;
use crate::templates;

/// Everything a request handler can reach. Cloning is cheap; all members are shared.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: DbPool,
    pub templates: Arc<Tera>,
    pub generator: Arc<QuoteGenerator>,
    pub runtime: Arc<AgentRuntime>,
    pub monitor: Arc<ActivityMonitor>,
    pub registry: Arc<AgentRegistry>,
    pub protocol: Arc<A2aProtocol>,
    pub negotiator: Arc<SkillNegotiator>,
    pub agents: Arc<TransPakAgents>,
    pub validators: Arc<ExternalValidators>,
    pub rate_limiter: Arc<RateLimiter>,
    pub session_secret: SecretString,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db_pool: DbPool,
        session_secret: SecretString,
        llm: Option<Arc<dyn LlmClient>>,
        transport: Option<Arc<dyn ExternalTransport>>,
    ) -> Result<Self, tera::Error> {
        let cache = Arc::new(QuoteCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_entries,
        ));
        let runtime = AgentRuntime::new(llm, cache, Arc::new(AgentMetrics::new()));

        let registry = Arc::new(AgentRegistry::new());
        let agents = Arc::new(TransPakAgents::new());
        agents.register_all(&registry);
        let validators = Arc::new(ExternalValidators::new());
        validators.register_all(&registry);

        let mut protocol = A2aProtocol::new(Arc::clone(&registry));
        if let Some(transport) = transport {
            protocol = protocol.with_transport(transport);
        }
        let protocol = Arc::new(protocol);
        let negotiator =
            Arc::new(SkillNegotiator::new(Arc::clone(&registry), Arc::clone(&protocol)));

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit.generate_quote_per_minute,
            Duration::from_secs(config.rate_limit.window_secs),
        ));

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            templates: Arc::new(templates::load()?),
            generator: Arc::new(QuoteGenerator::default()),
            runtime: Arc::new(runtime),
            monitor: Arc::new(ActivityMonitor::new()),
            registry,
            protocol,
            negotiator,
            agents,
            validators,
            rate_limiter,
            session_secret,
        })
    }

    pub fn shipments(&self) -> SqlShipmentRepository {
        SqlShipmentRepository::new(self.db_pool.clone())
    }

    pub fn quotes(&self) -> SqlQuoteRepository {
        SqlQuoteRepository::new(self.db_pool.clone())
    }

    pub fn history(&self) -> SqlQuoteHistoryRepository {
        SqlQuoteHistoryRepository::new(self.db_pool.clone())
    }

    pub fn ledger(&self) -> SqlQuoteLedger {
        SqlQuoteLedger::new(self.db_pool.clone())
    }

    pub fn users(&self) -> SqlUserRepository {
        SqlUserRepository::new(self.db_pool.clone())
    }

    pub fn analytics(&self) -> AnalyticsQueries {
        AnalyticsQueries::new(self.db_pool.clone())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use secrecy::SecretString;

    use transpak_core::config::AppConfig;
    use transpak_core::domain::shipment::ShipmentRequest;
    use transpak_db::{connect_with_settings, migrations};

    use super::AppState;

    pub const TEST_SECRET: &str = "test-session-secret-0123456789";

    /// Offline state over a migrated in-memory database.
    pub async fn offline_state() -> AppState {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        AppState::new(
            AppConfig::default(),
            pool,
            SecretString::from(TEST_SECRET.to_string()),
            None,
            None,
        )
        .expect("state")
    }

    pub fn printer() -> ShipmentRequest {
        ShipmentRequest {
            item_description: "Industrial printer".to_string(),
            dimensions: "48x36x24".to_string(),
            weight: "350 lbs".to_string(),
            origin: "San Jose, CA".to_string(),
            destination: "Austin, TX".to_string(),
            fragility: "Standard".to_string(),
            ..ShipmentRequest::default()
        }
    }
}
