pub mod advisor;
pub mod domain;
pub mod ingest;
pub mod llm;
pub mod pricing;
pub mod storage;

pub mod config {
    use anyhow::Context;

    /// Which family of adapters backs quotes and history.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DataSource {
        /// HTTP flight search + Postgres price history.
        Live,
        /// Synthetic listings and synthetic history. Nothing is recorded.
        Mock,
    }

    impl DataSource {
        pub fn parse(s: &str) -> anyhow::Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "live" | "real" => Ok(Self::Live),
                "mock" | "synthetic" => Ok(Self::Mock),
                other => anyhow::bail!("FARE_DATA_SOURCE must be live|mock (got {other:?})"),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub flight_api_base_url: Option<String>,
        pub flight_api_key: Option<String>,
        pub data_source: DataSource,
        pub mock_seed: Option<u64>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let data_source = match std::env::var("FARE_DATA_SOURCE") {
                Ok(s) if !s.trim().is_empty() => DataSource::parse(&s)?,
                _ => DataSource::Mock,
            };

            let mock_seed = match std::env::var("FARE_MOCK_SEED") {
                Ok(s) => Some(
                    s.trim()
                        .parse::<u64>()
                        .with_context(|| format!("FARE_MOCK_SEED must be a u64 (got {s:?})"))?,
                ),
                Err(_) => None,
            };

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                flight_api_base_url: std::env::var("FLIGHT_API_BASE_URL").ok(),
                flight_api_key: std::env::var("FLIGHT_API_KEY").ok(),
                data_source,
                mock_seed,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_flight_api_base_url(&self) -> anyhow::Result<&str> {
            self.flight_api_base_url
                .as_deref()
                .context("FLIGHT_API_BASE_URL is required")
        }
    }

}
