use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use transpak_core::domain::history::{ActionCount, QuoteAction, QuoteHistoryEntry};
use transpak_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use transpak_core::domain::shipment::{Shipment, ShipmentId, ValidatedShipment};
use transpak_core::domain::user::{User, UserId};

use super::{
    status_conflict, stored_now, NewQuote, QuoteHistoryRepository, QuotePage, QuoteRepository,
    RepositoryError, ShipmentRepository, UserRepository,
};

#[derive(Default)]
pub struct InMemoryShipmentRepository {
    shipments: RwLock<BTreeMap<i64, Shipment>>,
}

#[async_trait::async_trait]
impl ShipmentRepository for InMemoryShipmentRepository {
    async fn create(
        &self,
        shipment: &ValidatedShipment,
        user_id: Option<&UserId>,
    ) -> Result<Shipment, RepositoryError> {
        let mut shipments = self.shipments.write().await;
        let id = shipments.keys().next_back().copied().unwrap_or(0) + 1;
        let stored = Shipment {
            id: ShipmentId(id),
            user_id: user_id.cloned(),
            item_description: shipment.item_description.clone(),
            dimensions: shipment.dimensions.clone(),
            weight: shipment.weight.clone(),
            origin: shipment.origin.clone(),
            destination: shipment.destination.clone(),
            fragility: shipment.fragility,
            special_requirements: shipment.special_requirements.clone(),
            timeline: shipment.timeline.clone(),
            declared_value: shipment.declared_value.clone(),
            created_at: stored_now(),
        };
        shipments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        Ok(self.shipments.read().await.get(&id.0).cloned())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(self.shipments.read().await.len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<BTreeMap<i64, Quote>>,
}

impl InMemoryQuoteRepository {
    async fn newest_first(&self) -> Vec<Quote> {
        let quotes = self.quotes.read().await;
        let mut items: Vec<Quote> = quotes.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        items
    }
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn create(&self, quote: NewQuote) -> Result<Quote, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let id = quotes.keys().next_back().copied().unwrap_or(0) + 1;
        let now = stored_now();
        let stored = Quote {
            id: QuoteId(id),
            shipment_id: quote.shipment_id,
            reference: quote.reference,
            quote_content: quote.quote_content,
            agent_results: quote.agent_results,
            status: QuoteStatus::Generated,
            total_cost: quote.total_cost,
            created_at: now,
            updated_at: now,
        };
        quotes.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: QuoteId) -> Result<Option<Quote>, RepositoryError> {
        Ok(self.quotes.read().await.get(&id.0).cloned())
    }

    async fn list_page(&self, page: u32, per_page: u32) -> Result<QuotePage, RepositoryError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let all = self.newest_first().await;
        let total = all.len() as i64;
        let start = (page as usize - 1).saturating_mul(per_page as usize);
        let items = all.into_iter().skip(start).take(per_page as usize).collect();
        Ok(QuotePage::new(items, page, per_page, total))
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Quote>, RepositoryError> {
        Ok(self.newest_first().await.into_iter().take(limit as usize).collect())
    }

    async fn update_status(
        &self,
        id: QuoteId,
        from: QuoteStatus,
        to: QuoteStatus,
    ) -> Result<bool, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let Some(quote) = quotes.get_mut(&id.0) else {
            return Ok(false);
        };
        if quote.status != from {
            return Err(status_conflict(id, quote.status));
        }
        quote.status = to;
        quote.updated_at = stored_now();
        Ok(true)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(self.quotes.read().await.len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryQuoteHistoryRepository {
    entries: RwLock<Vec<QuoteHistoryEntry>>,
}

#[async_trait::async_trait]
impl QuoteHistoryRepository for InMemoryQuoteHistoryRepository {
    async fn append(&self, entry: QuoteHistoryEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|existing| existing.id == entry.id) {
            return Err(RepositoryError::Conflict("history entry already exists".to_string()));
        }
        entries.push(entry);
        Ok(())
    }

    async fn list_for_quote(
        &self,
        quote_id: QuoteId,
    ) -> Result<Vec<QuoteHistoryEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|entry| entry.quote_id == quote_id).cloned().collect())
    }

    async fn action_counts(&self) -> Result<Vec<ActionCount>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut counts: HashMap<QuoteAction, i64> = HashMap::new();
        for entry in entries.iter() {
            *counts.entry(entry.action).or_default() += 1;
        }

        let mut counts: Vec<ActionCount> =
            counts.into_iter().map(|(action, count)| ActionCount { action, count }).collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.action.as_str().cmp(b.action.as_str())));
        Ok(counts)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        let clashes = users.values().any(|existing| {
            existing.email == user.email
                || (user.api_key_digest.is_some() && existing.api_key_digest == user.api_key_digest)
        });
        if clashes || users.contains_key(&user.id.0) {
            return Err(RepositoryError::Conflict("user already exists".to_string()));
        }
        users.insert(user.id.0.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id.0).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = email.trim().to_ascii_lowercase();
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_api_key_digest(&self, digest: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.api_key_digest.as_deref() == Some(digest)).cloned())
    }

    async fn touch_last_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if let Some(user) = self.users.write().await.get_mut(&id.0) {
            user.last_login = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use transpak_core::domain::history::{QuoteAction, QuoteHistoryEntry};
    use transpak_core::domain::quote::{AgentResults, QuoteStatus};
    use transpak_core::domain::shipment::ShipmentRequest;
    use transpak_core::domain::user::User;
    use transpak_core::quote::QuoteGenerator;

    use crate::repositories::{
        InMemoryQuoteHistoryRepository, InMemoryQuoteRepository, InMemoryShipmentRepository,
        InMemoryUserRepository, NewQuote, QuoteHistoryRepository, QuoteRepository,
        RepositoryError, ShipmentRepository, UserRepository,
    };

    #[tokio::test]
    async fn in_memory_repositories_follow_the_sql_contract() {
        let shipments = InMemoryShipmentRepository::default();
        let quotes = InMemoryQuoteRepository::default();
        let history = InMemoryQuoteHistoryRepository::default();

        let validated = ShipmentRequest {
            item_description: "Medical scanner".to_string(),
            dimensions: "40x30x30".to_string(),
            weight: "250".to_string(),
            origin: "Los Angeles, CA".to_string(),
            destination: "New York, NY".to_string(),
            fragility: "High Value".to_string(),
            ..ShipmentRequest::default()
        }
        .validate()
        .expect("valid");
        let shipment = shipments.create(&validated, None).await.expect("shipment");
        let generated = <QuoteGenerator>::default().generate(&validated);

        let mut ids = Vec::new();
        for _ in 0..3 {
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
                .expect("quote");
            let created = QuoteHistoryEntry::new(quote.id, QuoteAction::Created);
            history.append(created).await.expect("history");
            ids.push(quote.id);
        }

        let page = quotes.list_page(2, 2).await.expect("page");
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, ids[0]);
        let declined = quotes.update_status(ids[1], QuoteStatus::Generated, QuoteStatus::Declined);
        assert!(declined.await.expect("update"));
        let again = quotes.update_status(ids[1], QuoteStatus::Generated, QuoteStatus::Accepted);
        assert!(matches!(again.await, Err(RepositoryError::Conflict(_))));

        let counts = history.action_counts().await.expect("counts");
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].count, 3);
        assert_eq!(shipments.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn in_memory_users_reject_duplicate_email() {
        let users = InMemoryUserRepository::default();
        users.create(User::new("ops@transpak.test", "TransPak", "Dana")).await.expect("first");

        let error = users
            .create(User::new("OPS@transpak.test", "Other", "Lee"))
            .await
            .expect_err("duplicate");
        assert!(matches!(error, RepositoryError::Conflict(_)));
        assert!(users.find_by_email(" Ops@TransPak.test ").await.expect("find").is_some());
    }
}
