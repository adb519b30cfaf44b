use crate::config::Settings;
use crate::domain::flight::{FlightOffer, FlightSearch, Route};
use crate::ingest::types::FlightSearchResponse;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PATH: &str = "/v1/flight_offers";
const DEFAULT_RETRIES: u32 = 3;
// Backoff stops doubling at 2^5 = 32s.
const MAX_BACKOFF_SHIFT: u32 = 5;

#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_flights(&self, route: &Route, date: NaiveDate) -> Result<FlightSearch>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonQuoteProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
    retries: u32,
}

impl HttpJsonQuoteProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_flight_api_base_url()?.to_string();
        let api_key = settings.flight_api_key.clone();

        let timeout_secs = std::env::var("FLIGHT_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("FLIGHT_API_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let path = std::env::var("FLIGHT_API_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build flight search http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
            retries,
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn fetch_once(&self, route: &Route, date: NaiveDate) -> Result<FlightSearchResponse> {
        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .query(&[
                ("origin", route.origin.clone()),
                ("destination", route.destination.clone()),
                ("date", date.to_string()),
            ])
            .send()
            .await
            .context("flight search request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read flight search response")?;
        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("flight search response is not valid JSON: {text}"))?;

        if !status.is_success() {
            anyhow::bail!("flight search HTTP {status}: {raw_json}");
        }

        serde_json::from_value::<FlightSearchResponse>(raw_json)
            .context("failed to parse flight search response into FlightSearchResponse")
    }
}

#[async_trait::async_trait]
impl QuoteProvider for HttpJsonQuoteProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_flights(&self, route: &Route, date: NaiveDate) -> Result<FlightSearch> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(route, date).await {
                Ok(resp) => {
                    validate_response(&resp, route, date)?;
                    return Ok(FlightSearch {
                        flights: resp.flights,
                        return_flights: None,
                    });
                }
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = backoff_delay(attempt);
                    tracing::warn!(attempt, ?backoff, %route, error = %err, "flight search failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    Duration::from_secs(1u64 << shift)
}

fn validate_response(resp: &FlightSearchResponse, route: &Route, date: NaiveDate) -> Result<()> {
    anyhow::ensure!(
        resp.origin.eq_ignore_ascii_case(&route.origin)
            && resp.destination.eq_ignore_ascii_case(&route.destination),
        "flight search route mismatch: expected {route}, got {}-{}",
        resp.origin,
        resp.destination
    );
    anyhow::ensure!(
        resp.date == date,
        "flight search date mismatch: expected {date}, got {}",
        resp.date
    );

    for offer in &resp.flights {
        validate_offer(offer)?;
    }
    Ok(())
}

fn validate_offer(offer: &FlightOffer) -> Result<()> {
    anyhow::ensure!(!offer.airline.trim().is_empty(), "airline must be non-empty");
    anyhow::ensure!(
        offer.price.is_finite() && offer.price >= 0.0,
        "price must be finite and non-negative (got {})",
        offer.price
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(price: Value) -> Value {
        json!({
            "origin": "JFK",
            "destination": "LAX",
            "date": "2026-11-01",
            "currency": "USD",
            "flights": [
                {
                    "airline": "B6",
                    "price": price,
                    "departure_time": "2026-11-01T06:00:00",
                    "arrival_time": "2026-11-01T09:20:00",
                    "duration": "PT6H20M",
                    "stops": 0
                }
            ]
        })
    }

    #[test]
    fn parses_expected_shape() {
        let parsed: FlightSearchResponse = serde_json::from_value(response(json!(231.4))).unwrap();
        assert_eq!(parsed.flights.len(), 1);
        assert_eq!(parsed.flights[0].price, 231.4);
        assert_eq!(parsed.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn rejects_string_prices_via_deserialize() {
        let res = serde_json::from_value::<FlightSearchResponse>(response(json!("231.40")));
        assert!(res.is_err());
    }

    #[test]
    fn validates_route_date_and_offers() {
        let route: Route = "JFK-LAX".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();

        let ok: FlightSearchResponse = serde_json::from_value(response(json!(231.4))).unwrap();
        assert!(validate_response(&ok, &route, date).is_ok());
        assert!(validate_response(&ok, &route.reversed(), date).is_err());
        assert!(validate_response(&ok, &route, date.succ_opt().unwrap()).is_err());

        let negative: FlightSearchResponse = serde_json::from_value(response(json!(-1.0))).unwrap();
        assert!(validate_response(&negative, &route, date).is_err());
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
        assert_eq!(backoff_delay(6), Duration::from_secs(32));
        assert_eq!(backoff_delay(100), Duration::from_secs(32));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_secs(32));
    }
}
