pub mod memory;
pub mod price_history;

use crate::domain::flight::Route;
use anyhow::Context;

/// Default lookback, in stored snapshots, when loading history for a route.
pub const DEFAULT_HISTORY_DAYS: usize = 30;

#[async_trait::async_trait]
pub trait HistoryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Prices from the newest `days` snapshots for `route`, flattened oldest
    /// first. May be empty.
    async fn history(&self, route: &Route, days: usize) -> anyhow::Result<Vec<f64>>;
}

#[async_trait::async_trait]
pub trait HistoryRecorder: Send + Sync {
    async fn record(&self, route: &Route, prices: &[f64]) -> anyhow::Result<()>;
}

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
