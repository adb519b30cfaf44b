use crate::domain::flight::Route;
use crate::storage::{HistoryProvider, HistoryRecorder};
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local price history with the same windowing as
/// [`super::price_history::PgPriceHistory`].
#[derive(Debug, Default)]
pub struct MemoryPriceHistory {
    // Snapshots per route key, oldest first.
    snapshots: RwLock<HashMap<String, Vec<Vec<f64>>>>,
}

impl MemoryPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a route with one snapshot per price, oldest first.
    pub fn with_daily_prices(self, route: &Route, prices: &[f64]) -> Self {
        {
            let mut guard = self.snapshots.write().unwrap_or_else(|e| e.into_inner());
            let entry = guard.entry(route.key()).or_default();
            entry.extend(prices.iter().map(|p| vec![*p]));
        }
        self
    }

    pub fn snapshot_count(&self, route: &Route) -> usize {
        self.snapshots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&route.key())
            .map_or(0, Vec::len)
    }
}

#[async_trait::async_trait]
impl HistoryProvider for MemoryPriceHistory {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn history(&self, route: &Route, days: usize) -> anyhow::Result<Vec<f64>> {
        let guard = self.snapshots.read().unwrap_or_else(|e| e.into_inner());
        let Some(snapshots) = guard.get(&route.key()) else {
            return Ok(Vec::new());
        };

        let start = snapshots.len().saturating_sub(days);
        Ok(snapshots[start..]
            .iter()
            .flat_map(|s| s.iter().copied())
            .collect())
    }
}

#[async_trait::async_trait]
impl HistoryRecorder for MemoryPriceHistory {
    async fn record(&self, route: &Route, prices: &[f64]) -> anyhow::Result<()> {
        anyhow::ensure!(!prices.is_empty(), "prices must be non-empty");
        let mut guard = self.snapshots.write().unwrap_or_else(|e| e.into_inner());
        guard.entry(route.key()).or_default().push(prices.to_vec());
        Ok(())
    }
}
