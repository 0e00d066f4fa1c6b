use secrecy::{ExposeSecret, SecretString};
use transpak_core::domain::history::{QuoteAction, QuoteHistoryEntry};
use transpak_core::domain::quote::{AgentResults, QuoteStatus};
use transpak_core::domain::shipment::ShipmentRequest;
use transpak_core::domain::user::{api_key_digest, User};
use transpak_core::quote::QuoteGenerator;
use transpak_db::{
    connect_with_settings, migrations, AnalyticsQueries, DbPool, NewQuote,
    QuoteHistoryRepository, QuoteRepository, ShipmentRepository, SqlQuoteHistoryRepository,
    SqlQuoteRepository, SqlShipmentRepository, SqlUserRepository, UserRepository,
};

type LifecycleTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn migrated_pool() -> LifecycleTestResult<DbPool> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    Ok(pool)
}

fn request() -> ShipmentRequest {
    ShipmentRequest {
        item_description: "Industrial printer".to_string(),
        dimensions: "48x36x24".to_string(),
        weight: "350 lbs".to_string(),
        origin: "San Jose, CA".to_string(),
        destination: "Austin, TX".to_string(),
        ..ShipmentRequest::default()
    }
}

#[tokio::test]
async fn attributed_quote_flows_from_creation_to_acceptance() -> LifecycleTestResult {
    let pool = migrated_pool().await?;
    let users = SqlUserRepository::new(pool.clone());
    let shipments = SqlShipmentRepository::new(pool.clone());
    let quotes = SqlQuoteRepository::new(pool.clone());
    let history = SqlQuoteHistoryRepository::new(pool.clone());

    let secret = SecretString::from("lifecycle-session-secret".to_string());
    let mut user = User::new("logistics@acme.test", "Acme", "Jordan");
    let api_key = user.issue_api_key(&secret);
    users.create(user).await.map_err(|error| format!("create user: {error}"))?;

    let digest = api_key_digest(&secret, api_key.expose_secret());
    let owner = users
        .find_by_api_key_digest(&digest)
        .await
        .map_err(|error| format!("lookup by key: {error}"))?
        .ok_or_else(|| "api key should resolve to its user".to_string())?;

    let validated = request().validate().map_err(|error| error.to_string())?;
    let shipment = shipments
        .create(&validated, Some(&owner.id))
        .await
        .map_err(|error| format!("create shipment: {error}"))?;
    require_eq!(shipment.user_id.as_ref(), Some(&owner.id));

    let generated = <QuoteGenerator>::default().generate(&validated);
    let quote = quotes
        .create(NewQuote {
            shipment_id: shipment.id,
            reference: generated.reference.clone(),
            quote_content: generated.quote_content.clone(),
            total_cost: generated.cost_breakdown.total,
            agent_results: AgentResults {
                agent_activity: generated.agent_activity.clone(),
                cost_breakdown: generated.cost_breakdown.clone(),
            },
        })
        .await
        .map_err(|error| format!("create quote: {error}"))?;
    require_eq!(quote.total_cost, quote.agent_results.cost_breakdown.component_sum());

    history
        .append(
            QuoteHistoryEntry::new(quote.id, QuoteAction::Created)
                .with_user_info("user_agent", "integration-test"),
        )
        .await
        .map_err(|error| format!("append created: {error}"))?;

    let mut stored = quotes
        .find_by_id(quote.id)
        .await
        .map_err(|error| format!("find quote: {error}"))?
        .ok_or_else(|| "quote should exist".to_string())?;
    stored.transition_to(QuoteStatus::Accepted).map_err(|error| error.to_string())?;
    let updated = quotes
        .update_status(stored.id, QuoteStatus::Generated, stored.status)
        .await
        .map_err(|error| format!("update status: {error}"))?;
    require!(updated, "status update should touch the stored quote");
    history
        .append(QuoteHistoryEntry::new(quote.id, QuoteAction::for_status(stored.status)))
        .await
        .map_err(|error| format!("append accepted: {error}"))?;

    let actions: Vec<QuoteAction> = history
        .list_for_quote(quote.id)
        .await
        .map_err(|error| format!("list history: {error}"))?
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    require_eq!(actions, vec![QuoteAction::Created, QuoteAction::Accepted]);

    let report = AnalyticsQueries::new(pool)
        .quote_analytics(30, chrono::Utc::now())
        .await
        .map_err(|error| format!("analytics: {error}"))?;
    require_eq!(report.accepted_quotes, 1);
    require_eq!(report.accepted_value, quote.total_cost);
    require!((report.conversion_rate - 100.0).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn deleting_a_shipment_cascades_to_quotes_and_history() -> LifecycleTestResult {
    let pool = migrated_pool().await?;
    let seeded = transpak_db::DemoDataset::load(&pool)
        .await
        .map_err(|error| format!("seed: {error}"))?;
    require_eq!(seeded.quote_ids.len(), 3);

    sqlx::query("DELETE FROM shipments")
        .execute(&pool)
        .await
        .map_err(|error| format!("delete shipments: {error}"))?;

    let quote_count = SqlQuoteRepository::new(pool.clone())
        .count()
        .await
        .map_err(|error| format!("count quotes: {error}"))?;
    require_eq!(quote_count, 0);

    let actions = SqlQuoteHistoryRepository::new(pool)
        .action_counts()
        .await
        .map_err(|error| format!("count history: {error}"))?;
    require!(actions.is_empty(), "history should cascade with its quote");

    Ok(())
}
