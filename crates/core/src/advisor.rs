//! Orchestrates one advisory: quotes and history come in through the ports,
//! the pricing engine decides, the explainer narrates.

use crate::config::{DataSource, Settings};
use crate::domain::flight::{FlightSearch, Route};
use crate::domain::market::{BookingInsights, MarketAlert, PriceStatistics, TrendPrediction};
use crate::domain::recommendation::Advisory;
use crate::ingest::provider::{HttpJsonQuoteProvider, QuoteProvider};
use crate::ingest::synthetic::{SyntheticHistory, SyntheticQuoteProvider};
use crate::llm::anthropic::AnthropicClient;
use crate::llm::{explain_or_fallback, ExplainInput, Explainer};
use crate::pricing::{self, alerts, booking};
use crate::storage::price_history::PgPriceHistory;
use crate::storage::{HistoryProvider, HistoryRecorder, DEFAULT_HISTORY_DAYS};
use anyhow::Context;
use chrono::NaiveDate;
use std::sync::Arc;

/// Offers kept per leg after sorting by price.
pub const SHORTLIST_LEN: usize = 8;
/// Lookback used for weekday booking patterns.
pub const BOOKING_HISTORY_DAYS: usize = 90;

#[derive(Debug, Clone)]
pub struct AdvisoryQuery {
    pub route: Route,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub budget: f64,
}

#[derive(Clone)]
pub struct FareAdvisor {
    quotes: Arc<dyn QuoteProvider>,
    history: Arc<dyn HistoryProvider>,
    recorder: Option<Arc<dyn HistoryRecorder>>,
    explainer: Option<Arc<dyn Explainer>>,
}

impl FareAdvisor {
    pub fn new(quotes: Arc<dyn QuoteProvider>, history: Arc<dyn HistoryProvider>) -> Self {
        Self {
            quotes,
            history,
            recorder: None,
            explainer: None,
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn HistoryRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    /// Wires adapters for the configured [`DataSource`].
    ///
    /// Live mode needs a pool and `FLIGHT_API_BASE_URL`. The explainer is
    /// attached whenever `ANTHROPIC_API_KEY` is set.
    pub fn from_settings(settings: &Settings, pool: Option<sqlx::PgPool>) -> anyhow::Result<Self> {
        let advisor = match settings.data_source {
            DataSource::Live => {
                let pool = pool.context("live data source requires a database pool")?;
                let store = Arc::new(PgPriceHistory::new(pool));
                let quotes = Arc::new(HttpJsonQuoteProvider::from_settings(settings)?);
                Self::new(quotes, store.clone()).with_recorder(store)
            }
            DataSource::Mock => {
                // Mock fares are generated per read and never recorded.
                let quotes = Arc::new(SyntheticQuoteProvider::new(settings.mock_seed));
                let history = Arc::new(SyntheticHistory::new(settings.mock_seed));
                Self::new(quotes, history)
            }
        };

        let advisor = if settings.anthropic_api_key.is_some() {
            advisor.with_explainer(Arc::new(AnthropicClient::from_settings(settings)?))
        } else {
            advisor
        };

        tracing::info!(
            data_source = ?settings.data_source,
            quotes = advisor.quotes.provider_name(),
            history = advisor.history.provider_name(),
            explainer = advisor.explainer.is_some(),
            "fare advisor configured"
        );
        Ok(advisor)
    }

    pub fn records_history(&self) -> bool {
        self.recorder.is_some()
    }

    pub async fn advise(&self, query: &AdvisoryQuery) -> anyhow::Result<Advisory> {
        pricing::validate_budget(query.budget)?;
        let route = &query.route;

        let search = self.search(route, query.departure_date, query.return_date).await?;
        let prices = search.prices();
        if !prices.is_empty() {
            self.record(route, &prices).await;
        }
        let search = search.shortlist(SHORTLIST_LEN);

        let history = self.load_history(route, DEFAULT_HISTORY_DAYS).await;
        let stats = pricing::summarize(&history);

        let cheapest = search.cheapest().cloned();
        let recommendation = cheapest
            .as_ref()
            .map(|offer| pricing::decide(offer.price, &stats, query.budget));

        let trend = pricing::predict(&history, pricing::DEFAULT_HORIZON_DAYS);
        let booking = self.booking_insights(route).await;

        let explain_input = ExplainInput {
            route: route.clone(),
            departure_date: query.departure_date,
            budget: query.budget,
            cheapest_price: cheapest.as_ref().map(|f| f.price),
            stats,
            recommendation: recommendation.clone(),
            momentum: pricing::trend::recent_momentum(&history),
        };
        let (explanation, explanation_source) =
            explain_or_fallback(self.explainer.as_deref(), &explain_input).await;

        tracing::info!(
            %route,
            departure_date = %query.departure_date,
            flights = search.flights.len(),
            history_len = history.len(),
            fallback_stats = stats.is_fallback(),
            decision = ?recommendation.as_ref().map(|r| r.decision),
            trend = %trend.trend,
            "advisory computed"
        );

        Ok(Advisory {
            route: route.clone(),
            departure_date: query.departure_date,
            return_date: query.return_date,
            budget: query.budget,
            cheapest,
            flights: search.flights,
            return_flights: search.return_flights,
            history_len: history.len(),
            stats,
            recommendation,
            trend,
            booking,
            explanation,
            explanation_source,
        })
    }

    pub async fn stats(&self, route: &Route) -> PriceStatistics {
        pricing::summarize(&self.load_history(route, DEFAULT_HISTORY_DAYS).await)
    }

    pub async fn trend(&self, route: &Route, horizon_days: usize) -> TrendPrediction {
        pricing::predict(&self.load_history(route, DEFAULT_HISTORY_DAYS).await, horizon_days)
    }

    pub async fn booking_insights(&self, route: &Route) -> BookingInsights {
        booking::booking_insights(&self.load_history(route, BOOKING_HISTORY_DAYS).await)
    }

    /// Price-drop alerts for `routes` departing on `date`. Routes that fail to
    /// fetch are logged and skipped.
    pub async fn market_alerts(&self, routes: &[Route], date: NaiveDate) -> Vec<MarketAlert> {
        let mut out = Vec::new();
        for route in routes {
            let search = match self.quotes.fetch_flights(route, date).await {
                Ok(search) => search,
                Err(err) => {
                    tracing::warn!(%route, error = %err, "alert scan: flight search failed; skipping route");
                    continue;
                }
            };
            let Some(cheapest) = search.cheapest() else {
                continue;
            };

            let history = self.load_history(route, DEFAULT_HISTORY_DAYS).await;
            if let Some(alert) = alerts::scan_alert(route, cheapest.price, &history) {
                tracing::info!(%route, savings = alert.savings, urgency = ?alert.urgency, "price drop alert");
                out.push(alert);
            }
        }
        out
    }

    /// Fetches current fares and stores them as a history snapshot. Returns the
    /// number of prices recorded.
    pub async fn snapshot(&self, route: &Route, date: NaiveDate) -> anyhow::Result<usize> {
        let recorder = self
            .recorder
            .as_ref()
            .context("no history recorder configured")?;
        let search = self.search(route, date, None).await?;
        let prices = search.prices();
        if prices.is_empty() {
            return Ok(0);
        }
        recorder
            .record(route, &prices)
            .await
            .with_context(|| format!("failed to record prices for {route}"))?;
        Ok(prices.len())
    }

    async fn search(
        &self,
        route: &Route,
        date: NaiveDate,
        return_date: Option<NaiveDate>,
    ) -> anyhow::Result<FlightSearch> {
        let mut search = self
            .quotes
            .fetch_flights(route, date)
            .await
            .with_context(|| format!("flight search failed for {route} on {date}"))?;

        if let Some(return_date) = return_date {
            let back = route.reversed();
            let ret = self
                .quotes
                .fetch_flights(&back, return_date)
                .await
                .with_context(|| format!("flight search failed for {back} on {return_date}"))?;
            search.return_flights = Some(ret.flights);
        }

        Ok(search)
    }

    async fn record(&self, route: &Route, prices: &[f64]) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        if let Err(err) = recorder.record(route, prices).await {
            tracing::warn!(%route, error = %err, "failed to record price snapshot");
        }
    }

    async fn load_history(&self, route: &Route, days: usize) -> Vec<f64> {
        match self.history.history(route, days).await {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(%route, error = %err, "price history unavailable; using empty history");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flight::FlightOffer;
    use crate::domain::market::AlertUrgency;
    use crate::domain::recommendation::{Decision, ExplanationSource};
    use crate::ingest::synthetic::SYNTHETIC_HISTORY_DAYS;
    use crate::storage::memory::MemoryPriceHistory;
    use std::collections::HashMap;

    struct FixedQuotes(HashMap<String, Vec<f64>>);

    impl FixedQuotes {
        fn new(entries: &[(&str, Vec<f64>)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            )
        }
    }

    #[async_trait::async_trait]
    impl QuoteProvider for FixedQuotes {
        fn provider_name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_flights(&self, route: &Route, _date: NaiveDate) -> anyhow::Result<FlightSearch> {
            let prices = self
                .0
                .get(&route.key())
                .with_context(|| format!("no quotes for {route}"))?;
            Ok(FlightSearch {
                flights: prices
                    .iter()
                    .map(|p| FlightOffer {
                        airline: "UA".to_string(),
                        price: *p,
                        departure_time: "08:00".to_string(),
                        arrival_time: "13:20".to_string(),
                        duration: None,
                        stops: 0,
                        booking_class: "Economy".to_string(),
                    })
                    .collect(),
                return_flights: None,
            })
        }
    }

    struct BrokenHistory;

    #[async_trait::async_trait]
    impl HistoryProvider for BrokenHistory {
        fn provider_name(&self) -> &'static str {
            "broken"
        }

        async fn history(&self, _route: &Route, _days: usize) -> anyhow::Result<Vec<f64>> {
            anyhow::bail!("connection refused")
        }
    }

    fn route() -> Route {
        "JFK-LAX".parse().unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 20).unwrap()
    }

    fn query(budget: f64) -> AdvisoryQuery {
        AdvisoryQuery {
            route: route(),
            departure_date: date(),
            return_date: None,
            budget,
        }
    }

    fn rising_history() -> Vec<f64> {
        (0..30).map(|i| 200.0 + 5.0 * i as f64).collect()
    }

    #[tokio::test]
    async fn advises_on_cheapest_fare() {
        let quotes = FixedQuotes::new(&[("JFK-LAX", vec![410.0, 180.0, 260.0])]);
        let store = Arc::new(MemoryPriceHistory::new().with_daily_prices(&route(), &rising_history()));
        let advisor = FareAdvisor::new(Arc::new(quotes), store.clone()).with_recorder(store.clone());

        let advisory = advisor.advise(&query(500.0)).await.unwrap();

        assert_eq!(advisory.cheapest.as_ref().map(|f| f.price), Some(180.0));
        assert_eq!(advisory.flights.len(), 3);
        assert_eq!(advisory.flights[0].price, 180.0);
        assert_eq!(advisory.flights[2].price, 410.0);
        // The fresh snapshot is recorded before history is read, so the 30-day
        // window is days 1..=29 plus today's three fares.
        assert_eq!(store.snapshot_count(&route()), 31);
        assert_eq!(advisory.history_len, 32);
        // sorted[3] = 215, sorted[4] = 220, rank 3.1
        assert_eq!(advisory.stats.q10, 215);

        let rec = advisory.recommendation.as_ref().unwrap();
        assert_eq!(rec.decision, Decision::BuyNow);
        assert_eq!(advisory.explanation_source, ExplanationSource::Fallback);
        assert!(advisory.explanation.starts_with("Great deal! At $180"));

        assert!(advisory.trend.predicted_prices.is_some());
        // Today's fares land at indices 30..=32 in fetch order, so the 180
        // fare pulls weekday 3 down to a mean of 250.
        assert_eq!(advisory.booking.best_day, "Thursday");
    }

    #[tokio::test]
    async fn includes_return_leg() {
        let quotes = FixedQuotes::new(&[("JFK-LAX", vec![300.0]), ("LAX-JFK", vec![290.0, 270.0])]);
        let advisor = FareAdvisor::new(Arc::new(quotes), Arc::new(MemoryPriceHistory::new()));
        let mut q = query(400.0);
        q.return_date = date().succ_opt();

        let advisory = advisor.advise(&q).await.unwrap();
        let ret = advisory.return_flights.unwrap();
        assert_eq!(ret.iter().map(|f| f.price).collect::<Vec<_>>(), vec![270.0, 290.0]);
        // No history: fallback stats, 300 <= q90(300) and > q50 -> WAIT.
        assert!(advisory.stats.is_fallback());
        assert_eq!(advisory.recommendation.unwrap().decision, Decision::Wait);
    }

    #[tokio::test]
    async fn no_flights_yields_no_recommendation() {
        let quotes = FixedQuotes::new(&[("JFK-LAX", vec![])]);
        let advisor = FareAdvisor::new(Arc::new(quotes), Arc::new(MemoryPriceHistory::new()));
        let advisory = advisor.advise(&query(400.0)).await.unwrap();
        assert!(advisory.recommendation.is_none());
        assert_eq!(advisory.explanation, crate::llm::fallback::NO_FLIGHTS);
    }

    #[tokio::test]
    async fn history_failure_degrades_to_fallback_stats() {
        let quotes = FixedQuotes::new(&[("JFK-LAX", vec![230.0])]);
        let advisor = FareAdvisor::new(Arc::new(quotes), Arc::new(BrokenHistory));
        let advisory = advisor.advise(&query(400.0)).await.unwrap();
        assert!(advisory.stats.is_fallback());
        assert_eq!(advisory.trend, TrendPrediction::insufficient());
        assert_eq!(advisory.recommendation.unwrap().decision, Decision::Buy);
    }

    #[tokio::test]
    async fn rejects_non_positive_budget() {
        let quotes = FixedQuotes::new(&[("JFK-LAX", vec![230.0])]);
        let advisor = FareAdvisor::new(Arc::new(quotes), Arc::new(MemoryPriceHistory::new()));
        let err = advisor.advise(&query(0.0)).await.unwrap_err();
        assert!(err.downcast_ref::<pricing::InvalidInput>().is_some());
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let advisor = FareAdvisor::new(
            Arc::new(FixedQuotes::new(&[])),
            Arc::new(MemoryPriceHistory::new()),
        );
        assert!(advisor.advise(&query(400.0)).await.is_err());
    }

    #[tokio::test]
    async fn alerts_skip_failing_routes() {
        let jfk_mia: Route = "JFK-MIA".parse().unwrap();
        let quotes = FixedQuotes::new(&[("JFK-LAX", vec![150.0, 400.0]), ("JFK-MIA", vec![215.0])]);
        let history = MemoryPriceHistory::new()
            .with_daily_prices(&route(), &[300.0; 10])
            .with_daily_prices(&jfk_mia, &[220.0; 10]);
        let advisor = FareAdvisor::new(Arc::new(quotes), Arc::new(history));

        let routes = vec![route(), jfk_mia, "LAX-SFO".parse().unwrap()];
        let alerts = advisor.market_alerts(&routes, date()).await;

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].route, "JFK-LAX");
        assert_eq!(alerts[0].urgency, AlertUrgency::High);
        assert_eq!(alerts[0].savings, 150);
    }

    #[tokio::test]
    async fn snapshot_records_current_fares() {
        let quotes = FixedQuotes::new(&[("JFK-LAX", vec![310.0, 295.0])]);
        let store = Arc::new(MemoryPriceHistory::new());
        let advisor = FareAdvisor::new(Arc::new(quotes), store.clone()).with_recorder(store.clone());

        assert_eq!(advisor.snapshot(&route(), date()).await.unwrap(), 2);
        assert_eq!(store.history(&route(), 30).await.unwrap(), vec![310.0, 295.0]);

        let no_recorder = FareAdvisor::new(
            Arc::new(FixedQuotes::new(&[("JFK-LAX", vec![1.0])])),
            Arc::new(MemoryPriceHistory::new()),
        );
        assert!(no_recorder.snapshot(&route(), date()).await.is_err());
    }

    #[tokio::test]
    async fn records_every_fetched_fare_but_shortlists_the_response() {
        let fares: Vec<f64> = (0..12).map(|i| 400.0 - 10.0 * i as f64).collect();
        let quotes = FixedQuotes::new(&[("JFK-LAX", fares)]);
        let store = Arc::new(MemoryPriceHistory::new());
        let advisor = FareAdvisor::new(Arc::new(quotes), store.clone()).with_recorder(store.clone());

        let advisory = advisor.advise(&query(500.0)).await.unwrap();

        assert_eq!(advisory.flights.len(), SHORTLIST_LEN);
        assert_eq!(advisory.flights[0].price, 290.0);
        assert_eq!(advisory.history_len, 12);
        let stored = store.history(&route(), 30).await.unwrap();
        assert_eq!(stored.len(), 12);
        assert!(stored.contains(&400.0));
    }

    #[tokio::test]
    async fn mock_settings_read_synthetic_history_on_every_call() {
        let settings = Settings {
            database_url: None,
            anthropic_api_key: None,
            sentry_dsn: None,
            flight_api_base_url: None,
            flight_api_key: None,
            data_source: DataSource::Mock,
            mock_seed: Some(11),
        };
        let advisor = FareAdvisor::from_settings(&settings, None).unwrap();
        assert!(!advisor.records_history());

        let mut q = query(500.0);
        q.departure_date = chrono::Utc::now().date_naive() + chrono::Duration::days(21);

        for _ in 0..2 {
            let advisory = advisor.advise(&q).await.unwrap();
            assert!(!advisory.flights.is_empty());
            assert_eq!(advisory.history_len, SYNTHETIC_HISTORY_DAYS);
            assert!(!advisory.stats.is_fallback());
            assert!(advisory.trend.predicted_prices.is_some());
        }
        assert!(advisor.snapshot(&route(), q.departure_date).await.is_err());
    }
}
