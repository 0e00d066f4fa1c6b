//! Read-only reporting queries behind the analytics and dashboard endpoints.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use transpak_core::domain::history::ActionCount;

use crate::repositories::{
    decode_error, encode_timestamp, QuoteHistoryRepository, RepositoryError,
    SqlQuoteHistoryRepository,
};
use crate::DbPool;

pub const POPULAR_ROUTE_LIMIT: i64 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuoteCount {
    pub date: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCount {
    pub origin: String,
    pub destination: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub avg_time_seconds: f64,
    pub total_quotes: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteAnalytics {
    pub period_days: u32,
    pub total_quotes: i64,
    pub accepted_quotes: i64,
    pub conversion_rate: f64,
    pub average_quote_value: Decimal,
    pub total_quoted_value: Decimal,
    pub accepted_value: Decimal,
    pub status_distribution: BTreeMap<String, i64>,
    pub daily_volume: Vec<DailyQuoteCount>,
}

pub struct AnalyticsQueries {
    pool: DbPool,
}

impl AnalyticsQueries {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn daily_quote_counts(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyQuoteCount>, RepositoryError> {
        let cutoff = encode_timestamp(now - Duration::days(i64::from(days)));
        let rows = sqlx::query(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*) AS count
             FROM quotes WHERE created_at >= ?
             GROUP BY day ORDER BY day ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DailyQuoteCount {
                    date: row.try_get("day").map_err(decode_error)?,
                    count: row.try_get("count").map_err(decode_error)?,
                })
            })
            .collect()
    }

    /// Most quoted origin/destination pairs.
    pub async fn popular_routes(&self) -> Result<Vec<RouteCount>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT s.origin AS origin, s.destination AS destination, COUNT(q.id) AS count
             FROM shipments s JOIN quotes q ON q.shipment_id = s.id
             GROUP BY s.origin, s.destination
             ORDER BY count DESC, s.origin ASC, s.destination ASC
             LIMIT ?",
        )
        .bind(POPULAR_ROUTE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RouteCount {
                    origin: row.try_get("origin").map_err(decode_error)?,
                    destination: row.try_get("destination").map_err(decode_error)?,
                    count: row.try_get("count").map_err(decode_error)?,
                })
            })
            .collect()
    }

    /// Mean seconds between a shipment being stored and its quote being stored.
    pub async fn processing_stats(&self) -> Result<ProcessingStats, RepositoryError> {
        let row = sqlx::query(
            "SELECT AVG((julianday(q.created_at) - julianday(s.created_at)) * 86400.0) AS avg_secs,
                    COUNT(q.id) AS total_quotes
             FROM quotes q JOIN shipments s ON s.id = q.shipment_id",
        )
        .fetch_one(&self.pool)
        .await?;

        let avg_secs: Option<f64> = row.try_get("avg_secs").map_err(decode_error)?;
        Ok(ProcessingStats {
            avg_time_seconds: avg_secs.unwrap_or(0.0).max(0.0),
            total_quotes: row.try_get("total_quotes").map_err(decode_error)?,
        })
    }

    pub async fn history_action_counts(&self) -> Result<Vec<ActionCount>, RepositoryError> {
        SqlQuoteHistoryRepository::new(self.pool.clone()).action_counts().await
    }

    /// Volume, conversion and value figures for quotes created within the last `days`.
    pub async fn quote_analytics(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<QuoteAnalytics, RepositoryError> {
        let cutoff = encode_timestamp(now - Duration::days(i64::from(days)));
        let rows = sqlx::query("SELECT status, total_cost FROM quotes WHERE created_at >= ?")
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        let mut status_distribution = BTreeMap::new();
        let mut total_quoted_value = Decimal::ZERO;
        let mut accepted_value = Decimal::ZERO;
        for row in &rows {
            let status: String = row.try_get("status").map_err(decode_error)?;
            let total_cost: String = row.try_get("total_cost").map_err(decode_error)?;
            let value = Decimal::from_str(&total_cost).map_err(decode_error)?;

            total_quoted_value += value;
            if status == "accepted" {
                accepted_value += value;
            }
            *status_distribution.entry(status).or_insert(0_i64) += 1;
        }

        let total_quotes = rows.len() as i64;
        let accepted_quotes = status_distribution.get("accepted").copied().unwrap_or(0);
        let conversion_rate = if total_quotes > 0 {
            accepted_quotes as f64 / total_quotes as f64 * 100.0
        } else {
            0.0
        };
        let average_quote_value = if total_quotes > 0 {
            (total_quoted_value / Decimal::from(total_quotes))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };

        Ok(QuoteAnalytics {
            period_days: days,
            total_quotes,
            accepted_quotes,
            conversion_rate,
            average_quote_value,
            total_quoted_value,
            accepted_value,
            status_distribution,
            daily_volume: self.daily_quote_counts(days, now).await?,
        })
    }
}
