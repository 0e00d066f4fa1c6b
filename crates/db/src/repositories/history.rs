use std::collections::BTreeMap;
use std::str::FromStr;

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use transpak_core::domain::history::{ActionCount, QuoteAction, QuoteHistoryEntry};
use transpak_core::domain::quote::QuoteId;

use super::{
    decode_error, decode_timestamp, encode_timestamp, QuoteHistoryRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlQuoteHistoryRepository {
    pool: DbPool,
}

impl SqlQuoteHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<QuoteHistoryEntry, RepositoryError> {
    let action: String = row.try_get("action").map_err(decode_error)?;
    let timestamp: String = row.try_get("timestamp").map_err(decode_error)?;
    let user_info: String = row.try_get("user_info").map_err(decode_error)?;

    Ok(QuoteHistoryEntry {
        id: row.try_get("id").map_err(decode_error)?,
        quote_id: QuoteId(row.try_get("quote_id").map_err(decode_error)?),
        action: QuoteAction::from_str(&action).map_err(decode_error)?,
        timestamp: decode_timestamp(&timestamp)?,
        user_info: serde_json::from_str::<BTreeMap<String, String>>(&user_info)
            .map_err(decode_error)?,
    })
}

pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    entry: &QuoteHistoryEntry,
) -> Result<(), RepositoryError> {
    let user_info = serde_json::to_string(&entry.user_info).map_err(decode_error)?;

    sqlx::query(
        "INSERT INTO quote_history (id, quote_id, action, timestamp, user_info)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(entry.quote_id.0)
    .bind(entry.action.as_str())
    .bind(encode_timestamp(entry.timestamp))
    .bind(user_info)
    .execute(&mut *conn)
    .await
    .map_err(|error| RepositoryError::from_write(error, "history entry"))?;

    Ok(())
}

#[async_trait::async_trait]
impl QuoteHistoryRepository for SqlQuoteHistoryRepository {
    async fn append(&self, entry: QuoteHistoryEntry) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut conn, &entry).await
    }

    async fn list_for_quote(
        &self,
        quote_id: QuoteId,
    ) -> Result<Vec<QuoteHistoryEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, quote_id, action, timestamp, user_info
             FROM quote_history WHERE quote_id = ? ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(quote_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn action_counts(&self) -> Result<Vec<ActionCount>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT action, COUNT(*) AS count FROM quote_history
             GROUP BY action ORDER BY count DESC, action ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let action: String = row.try_get("action").map_err(decode_error)?;
                Ok(ActionCount {
                    action: QuoteAction::from_str(&action).map_err(decode_error)?,
                    count: row.try_get("count").map_err(decode_error)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use transpak_core::domain::history::{QuoteAction, QuoteHistoryEntry};
    use transpak_core::domain::quote::QuoteId;

    use super::SqlQuoteHistoryRepository;
    use crate::fixtures::DemoDataset;
    use crate::repositories::{QuoteHistoryRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn history_is_listed_in_append_order_and_counted() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let seeded = DemoDataset::load(&pool).await.expect("seed");
        let quote_id = seeded.quote_ids[0];
        let repo = SqlQuoteHistoryRepository::new(pool);

        repo.append(
            QuoteHistoryEntry::new(quote_id, QuoteAction::Viewed)
                .with_user_info("user_agent", "Mozilla/5.0"),
        )
        .await
        .expect("append viewed");
        repo.append(QuoteHistoryEntry::new(quote_id, QuoteAction::Downloaded))
            .await
            .expect("append downloaded");

        let entries = repo.list_for_quote(quote_id).await.expect("list");
        let actions: Vec<QuoteAction> = entries.iter().map(|entry| entry.action).collect();
        assert_eq!(
            actions,
            vec![QuoteAction::Created, QuoteAction::Viewed, QuoteAction::Downloaded]
        );
        assert_eq!(
            entries[1].user_info.get("user_agent").map(String::as_str),
            Some("Mozilla/5.0")
        );

        let counts = repo.action_counts().await.expect("counts");
        assert_eq!(counts[0].action, QuoteAction::Created);
        assert_eq!(counts[0].count, 3);
    }

    #[tokio::test]
    async fn history_for_missing_quote_is_rejected() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlQuoteHistoryRepository::new(pool);

        let error = repo
            .append(QuoteHistoryEntry::new(QuoteId(31), QuoteAction::Viewed))
            .await
            .expect_err("foreign key must reject unknown quote");
        assert!(matches!(error, RepositoryError::Database(_)));
    }
}
