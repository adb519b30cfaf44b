use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Origin/destination pair. Airport codes are stored trimmed and upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Route {
    pub fn new(origin: &str, destination: &str) -> anyhow::Result<Self> {
        let origin = normalize_code(origin).context("invalid origin")?;
        let destination = normalize_code(destination).context("invalid destination")?;
        ensure!(
            origin != destination,
            "origin and destination must differ (got {origin})"
        );
        Ok(Self {
            origin,
            destination,
        })
    }

    /// Storage key, e.g. `JFK-LAX`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }

    pub fn reversed(&self) -> Self {
        Self {
            origin: self.destination.clone(),
            destination: self.origin.clone(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

impl FromStr for Route {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (origin, destination) = s
            .trim()
            .split_once('-')
            .with_context(|| format!("route must look like ORIGIN-DEST (got {s:?})"))?;
        Self::new(origin, destination)
    }
}

fn normalize_code(code: &str) -> anyhow::Result<String> {
    let code = code.trim().to_ascii_uppercase();
    ensure!(!code.is_empty(), "airport code must be non-empty");
    ensure!(
        code.chars().all(|c| c.is_ascii_alphanumeric()),
        "airport code must be alphanumeric (got {code:?})"
    );
    Ok(code)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub airline: String,
    pub price: f64,
    pub departure_time: String,
    pub arrival_time: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub stops: u32,
    #[serde(default = "default_booking_class")]
    pub booking_class: String,
}

fn default_booking_class() -> String {
    "Economy".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightSearch {
    pub flights: Vec<FlightOffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_flights: Option<Vec<FlightOffer>>,
}

impl FlightSearch {
    /// Sorts ascending by price and keeps at most `limit` offers per leg.
    pub fn shortlist(mut self, limit: usize) -> Self {
        sort_and_truncate(&mut self.flights, limit);
        if let Some(ret) = self.return_flights.as_mut() {
            sort_and_truncate(ret, limit);
        }
        self
    }

    pub fn cheapest(&self) -> Option<&FlightOffer> {
        self.flights
            .iter()
            .min_by(|a, b| a.price.total_cmp(&b.price))
    }

    pub fn prices(&self) -> Vec<f64> {
        self.flights.iter().map(|f| f.price).collect()
    }
}

fn sort_and_truncate(flights: &mut Vec<FlightOffer>, limit: usize) {
    flights.sort_by(|a, b| a.price.total_cmp(&b.price));
    flights.truncate(limit);
}
