use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fare_core::advisor::{AdvisoryQuery, FareAdvisor};
use fare_core::config::DataSource;
use fare_core::domain::flight::Route;
use fare_core::domain::market::{BookingInsights, MarketAlert, PriceStatistics, TrendPrediction};
use fare_core::domain::recommendation::Advisory;
use fare_core::pricing::{self, InvalidInput};

const MAX_HORIZON_DAYS: usize = 90;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fare_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool = match settings.data_source {
        DataSource::Live => connect_pool(&settings).await,
        DataSource::Mock => None,
    };

    let advisor = FareAdvisor::from_settings(&settings, pool).map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        e
    })?;

    let state = AppState { advisor };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/advice", get(get_advice))
        .route("/alerts", get(get_alerts))
        .route("/routes/:route/stats", get(get_stats))
        .route("/routes/:route/trend", get(get_trend))
        .route("/routes/:route/booking-insights", get(get_booking_insights))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, data_source = ?settings.data_source, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn connect_pool(settings: &fare_core::config::Settings) -> Option<PgPool> {
    let db_url = match settings.require_database_url() {
        Ok(url) => url,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; live history unavailable");
            return None;
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; live history unavailable");
            return None;
        }
    };

    match fare_core::storage::migrate(&pool).await {
        Ok(()) => Some(pool),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "db migrations failed; live history unavailable");
            None
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    advisor: FareAdvisor,
}

#[derive(Debug, Deserialize)]
struct AdviceParams {
    origin: String,
    destination: String,
    date: String,
    budget: f64,
    return_date: Option<String>,
}

impl AdviceParams {
    fn into_query(self) -> Result<AdvisoryQuery, StatusCode> {
        let route =
            Route::new(&self.origin, &self.destination).map_err(|_| StatusCode::BAD_REQUEST)?;
        let departure_date = parse_date(&self.date)?;
        let return_date = self.return_date.as_deref().map(parse_date).transpose()?;
        if return_date.is_some_and(|r| r < departure_date) {
            return Err(StatusCode::BAD_REQUEST);
        }
        pricing::validate_budget(self.budget).map_err(|_| StatusCode::BAD_REQUEST)?;

        Ok(AdvisoryQuery {
            route,
            departure_date,
            return_date,
            budget: self.budget,
        })
    }
}

async fn get_advice(
    State(state): State<AppState>,
    Query(params): Query<AdviceParams>,
) -> Result<Json<Advisory>, StatusCode> {
    let query = params.into_query()?;

    let advisory = state.advisor.advise(&query).await.map_err(|e| {
        if e.downcast_ref::<InvalidInput>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(route = %query.route, error = %e, "advice failed");
        StatusCode::BAD_GATEWAY
    })?;

    Ok(Json(advisory))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(route): Path<String>,
) -> Result<Json<PriceStatistics>, StatusCode> {
    let route = parse_route(&route)?;
    Ok(Json(state.advisor.stats(&route).await))
}

#[derive(Debug, Deserialize)]
struct TrendParams {
    horizon_days: Option<usize>,
}

async fn get_trend(
    State(state): State<AppState>,
    Path(route): Path<String>,
    Query(params): Query<TrendParams>,
) -> Result<Json<TrendPrediction>, StatusCode> {
    let route = parse_route(&route)?;
    let horizon_days = params.horizon_days.unwrap_or(pricing::DEFAULT_HORIZON_DAYS);
    if !(1..=MAX_HORIZON_DAYS).contains(&horizon_days) {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(state.advisor.trend(&route, horizon_days).await))
}

async fn get_booking_insights(
    State(state): State<AppState>,
    Path(route): Path<String>,
) -> Result<Json<BookingInsights>, StatusCode> {
    let route = parse_route(&route)?;
    Ok(Json(state.advisor.booking_insights(&route).await))
}

#[derive(Debug, Deserialize)]
struct AlertParams {
    routes: String,
    date: Option<String>,
}

async fn get_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertParams>,
) -> Result<Json<Vec<MarketAlert>>, StatusCode> {
    let routes = params
        .routes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_route)
        .collect::<Result<Vec<_>, _>>()?;
    if routes.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let date = match params.date.as_deref() {
        Some(s) => parse_date(s)?,
        None => chrono::Utc::now().date_naive(),
    };

    Ok(Json(state.advisor.market_alerts(&routes, date).await))
}

fn parse_route(s: &str) -> Result<Route, StatusCode> {
    s.parse::<Route>().map_err(|_| StatusCode::BAD_REQUEST)
}

fn parse_date(s: &str) -> Result<NaiveDate, StatusCode> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| StatusCode::BAD_REQUEST)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &fare_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
