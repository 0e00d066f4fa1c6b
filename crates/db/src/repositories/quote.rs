use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use transpak_core::domain::quote::{AgentResults, Quote, QuoteId, QuoteStatus};
use transpak_core::domain::shipment::ShipmentId;

use super::{
    decode_error, decode_timestamp, encode_timestamp, status_conflict, stored_now, NewQuote,
    QuotePage, QuoteRepository, RepositoryError,
};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, shipment_id, reference, quote_content, agent_results,
        status, total_cost, created_at, updated_at
     FROM quotes";

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_quote(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    let agent_results: String = row.try_get("agent_results").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let total_cost: String = row.try_get("total_cost").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    Ok(Quote {
        id: QuoteId(row.try_get("id").map_err(decode_error)?),
        shipment_id: ShipmentId(row.try_get("shipment_id").map_err(decode_error)?),
        reference: row.try_get("reference").map_err(decode_error)?,
        quote_content: row.try_get("quote_content").map_err(decode_error)?,
        agent_results: serde_json::from_str::<AgentResults>(&agent_results)
            .map_err(decode_error)?,
        status: QuoteStatus::from_str(&status).map_err(decode_error)?,
        total_cost: Decimal::from_str(&total_cost).map_err(decode_error)?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

pub(crate) async fn insert_quote(
    conn: &mut SqliteConnection,
    quote: NewQuote,
) -> Result<Quote, RepositoryError> {
    let now = stored_now();
    let agent_results = serde_json::to_string(&quote.agent_results).map_err(decode_error)?;

    let result = sqlx::query(
        "INSERT INTO quotes (shipment_id, reference, quote_content, agent_results, status,
                             total_cost, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(quote.shipment_id.0)
    .bind(&quote.reference)
    .bind(&quote.quote_content)
    .bind(&agent_results)
    .bind(QuoteStatus::Generated.as_str())
    .bind(quote.total_cost.to_string())
    .bind(encode_timestamp(now))
    .bind(encode_timestamp(now))
    .execute(&mut *conn)
    .await?;

    Ok(Quote {
        id: QuoteId(result.last_insert_rowid()),
        shipment_id: quote.shipment_id,
        reference: quote.reference,
        quote_content: quote.quote_content,
        agent_results: quote.agent_results,
        status: QuoteStatus::Generated,
        total_cost: quote.total_cost,
        created_at: now,
        updated_at: now,
    })
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn create(&self, quote: NewQuote) -> Result<Quote, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_quote(&mut conn, quote).await
    }

    async fn find_by_id(&self, id: QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_quote).transpose()
    }

    async fn list_page(&self, page: u32, per_page: u32) -> Result<QuotePage, RepositoryError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let total = self.count().await?;
        let offset = i64::from(page - 1) * i64::from(per_page);

        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(row_to_quote).collect::<Result<Vec<_>, _>>()?;
        Ok(QuotePage::new(items, page, per_page, total))
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Quote>, RepositoryError> {
        let rows =
            sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ?"))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_quote).collect()
    }

    async fn update_status(
        &self,
        id: QuoteId,
        from: QuoteStatus,
        to: QuoteStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE quotes SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(encode_timestamp(stored_now()))
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM quotes WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        match current {
            None => Ok(false),
            Some(raw) => {
                let current = QuoteStatus::from_str(&raw).map_err(decode_error)?;
                Err(status_conflict(id, current))
            }
        }
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM quotes").fetch_one(&self.pool).await?;
        row.try_get("count").map_err(decode_error)
    }
}
