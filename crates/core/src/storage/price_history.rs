use crate::domain::flight::Route;
use crate::storage::{HistoryProvider, HistoryRecorder};
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Price history in Postgres: one row per recorded snapshot of a route.
#[derive(Debug, Clone)]
pub struct PgPriceHistory {
    pool: sqlx::PgPool,
}

impl PgPriceHistory {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_snapshot(
        &self,
        route: &Route,
        recorded_at: DateTime<Utc>,
        prices: &[f64],
    ) -> anyhow::Result<Uuid> {
        anyhow::ensure!(!prices.is_empty(), "prices must be non-empty");
        anyhow::ensure!(
            prices.iter().all(|p| p.is_finite() && *p >= 0.0),
            "prices must be finite and non-negative"
        );

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO flight_price_history (id, route, recorded_at, prices) \
             VALUES ($1, $2, $3, $4)",
        )
        .persistent(false)
        .bind(id)
        .bind(route.key())
        .bind(recorded_at)
        .bind(prices.to_vec())
        .execute(&self.pool)
        .await
        .context("insert flight_price_history failed")?;

        Ok(id)
    }
}

#[async_trait::async_trait]
impl HistoryProvider for PgPriceHistory {
    fn provider_name(&self) -> &'static str {
        "postgres"
    }

    async fn history(&self, route: &Route, days: usize) -> anyhow::Result<Vec<f64>> {
        let rows = sqlx::query_as::<_, (Vec<f64>,)>(
            "SELECT prices FROM ( \
                 SELECT prices, recorded_at \
                 FROM flight_price_history \
                 WHERE route = $1 \
                 ORDER BY recorded_at DESC \
                 LIMIT $2 \
             ) recent \
             ORDER BY recorded_at ASC",
        )
        .persistent(false)
        .bind(route.key())
        .bind(days as i64)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("select flight_price_history failed (route={route})"))?;

        Ok(rows.into_iter().flat_map(|(prices,)| prices).collect())
    }
}

#[async_trait::async_trait]
impl HistoryRecorder for PgPriceHistory {
    async fn record(&self, route: &Route, prices: &[f64]) -> anyhow::Result<()> {
        let id = self.insert_snapshot(route, Utc::now(), prices).await?;
        tracing::debug!(%route, %id, samples = prices.len(), "recorded price snapshot");
        Ok(())
    }
}
