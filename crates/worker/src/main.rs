use anyhow::Context;
use clap::Parser;
use fare_core::advisor::FareAdvisor;
use fare_core::config::DataSource;
use fare_core::domain::flight::Route;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "fare_worker")]
struct Args {
    /// Comma-separated routes to snapshot, e.g. JFK-LAX,LAX-SFO.
    #[arg(long, value_delimiter = ',', required = true)]
    routes: Vec<String>,

    /// Departure date to quote (YYYY-MM-DD). Defaults to today's UTC date.
    #[arg(long)]
    date: Option<String>,

    /// Fetch and scan for alerts without writing price history.
    #[arg(long)]
    dry_run: bool,
}

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

    let args = Args::parse();

    let routes = parse_routes(&args.routes)?;
    let date = resolve_date(args.date.as_deref())?;

    let pool = match settings.data_source {
        DataSource::Live => {
            let db_url = settings.require_database_url()?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .context("connect DATABASE_URL failed")?;
            fare_core::storage::migrate(&pool).await?;
            Some(pool)
        }
        DataSource::Mock => None,
    };

    let advisor = FareAdvisor::from_settings(&settings, pool)?;

    // Scan before recording so today's fares are compared against prior
    // snapshots only.
    let alerts = advisor.market_alerts(&routes, date).await;
    for alert in &alerts {
        tracing::info!(
            route = %alert.route,
            current_price = alert.current_price,
            savings = alert.savings,
            urgency = ?alert.urgency,
            "market alert"
        );
    }
    println!("{}", serde_json::to_string_pretty(&alerts)?);

    let mut recorded: usize = 0;
    let mut failures: usize = 0;
    if args.dry_run || !advisor.records_history() {
        tracing::info!(
            %date,
            dry_run = args.dry_run,
            data_source = ?settings.data_source,
            routes = routes.len(),
            "skipping price snapshots"
        );
    } else {
        for route in &routes {
            match advisor.snapshot(route, date).await {
                Ok(n) => {
                    recorded += n;
                    tracing::info!(%route, %date, prices = n, "recorded price snapshot");
                }
                Err(err) => {
                    failures += 1;
                    sentry_anyhow::capture_anyhow(&err);
                    tracing::error!(%route, %date, error = %format!("{err:#}"), "price snapshot failed");
                }
            }
        }
    }

    tracing::info!(
        %date,
        routes = routes.len(),
        recorded,
        failures,
        alerts = alerts.len(),
        "worker run finished"
    );
    Ok(())
}

fn parse_routes(raw: &[String]) -> anyhow::Result<Vec<Route>> {
    let routes = raw
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Route>())
        .collect::<anyhow::Result<Vec<_>>>()?;
    anyhow::ensure!(!routes.is_empty(), "--routes must name at least one route");
    Ok(routes)
}

fn resolve_date(date_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    if let Some(s) = date_arg {
        return chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("--date must be YYYY-MM-DD (got {s:?})"));
    }
    Ok(chrono::Utc::now().date_naive())
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
