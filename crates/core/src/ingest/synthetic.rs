//! Mock data sources used when no live flight API or database is configured.
//!
//! Listings and histories are randomized around per-route base fares, so
//! repeated calls differ unless a seed is supplied.

use crate::domain::flight::{FlightOffer, FlightSearch, Route};
use crate::ingest::provider::QuoteProvider;
use crate::storage::HistoryProvider;
use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub const SYNTHETIC_HISTORY_DAYS: usize = 30;
const UNKNOWN_ROUTE_BASE_FARE: f64 = 250.0;
const DEPARTURE_SLOTS: [&str; 4] = ["06:00", "08:30", "11:00", "14:30"];

struct RouteProfile {
    key: &'static str,
    base_fare: f64,
    airlines: &'static [&'static str],
}

const ROUTES: &[RouteProfile] = &[
    RouteProfile {
        key: "JFK-LAX",
        base_fare: 280.0,
        airlines: &["Delta", "JetBlue", "American", "United"],
    },
    RouteProfile {
        key: "LAX-JFK",
        base_fare: 290.0,
        airlines: &["Delta", "JetBlue", "American", "United"],
    },
    RouteProfile {
        key: "JFK-MIA",
        base_fare: 220.0,
        airlines: &["American", "JetBlue", "Delta"],
    },
    RouteProfile {
        key: "LAX-SFO",
        base_fare: 150.0,
        airlines: &["United", "Alaska", "Southwest"],
    },
];

fn profile(route: &Route) -> Option<&'static RouteProfile> {
    let key = route.key();
    ROUTES.iter().find(|p| p.key == key)
}

fn airline_factor(airline: &str) -> f64 {
    match airline {
        "Delta" => 1.1,
        "American" => 1.05,
        "JetBlue" | "Alaska" => 0.9,
        "Southwest" => 0.85,
        _ => 1.0,
    }
}

/// Close-in departures cost more, far-out ones less.
pub fn demand_factor(days_ahead: i64) -> f64 {
    if days_ahead < 14 {
        1.2
    } else if days_ahead > 60 {
        0.9
    } else {
        1.0
    }
}

/// Peak-season months are June, July and December.
pub fn seasonal_factor(month: u32) -> f64 {
    if matches!(month, 6 | 7 | 12) {
        1.1
    } else {
        0.95
    }
}

fn slot_factor(slot: usize) -> f64 {
    match slot {
        0 => 0.9,
        1 => 1.1,
        _ => 1.0,
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub struct SyntheticQuoteProvider {
    rng: Mutex<StdRng>,
}

impl SyntheticQuoteProvider {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Mutex::new(seeded_rng(seed)),
        }
    }

    pub fn generate(&self, route: &Route, date: NaiveDate, today: NaiveDate) -> FlightSearch {
        let Some(profile) = profile(route) else {
            return FlightSearch::default();
        };

        let demand = demand_factor((date - today).num_days());
        let seasonal = seasonal_factor(today.month());

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut flights = Vec::with_capacity(profile.airlines.len() * DEPARTURE_SLOTS.len());
        for airline in profile.airlines {
            for (slot, departure) in DEPARTURE_SLOTS.iter().enumerate() {
                let noise: f64 = rng.gen_range(0.9..1.1);
                let price = (profile.base_fare
                    * demand
                    * seasonal
                    * airline_factor(airline)
                    * slot_factor(slot)
                    * noise)
                    .trunc();

                flights.push(FlightOffer {
                    airline: airline.to_string(),
                    price,
                    departure_time: departure.to_string(),
                    arrival_time: arrival_after(departure, 5 * 60 + 20),
                    duration: Some("5h 20m".to_string()),
                    stops: 0,
                    booking_class: "Economy".to_string(),
                });
            }
        }

        flights.sort_by(|a, b| a.price.total_cmp(&b.price));
        FlightSearch {
            flights,
            return_flights: None,
        }
    }
}

fn arrival_after(departure: &str, minutes: i64) -> String {
    NaiveTime::parse_from_str(departure, "%H:%M")
        .map(|t| (t + chrono::Duration::minutes(minutes)).format("%H:%M").to_string())
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl QuoteProvider for SyntheticQuoteProvider {
    fn provider_name(&self) -> &'static str {
        "synthetic"
    }

    async fn fetch_flights(&self, route: &Route, date: NaiveDate) -> Result<FlightSearch> {
        Ok(self.generate(route, date, Utc::now().date_naive()))
    }
}

/// Thirty days of fares around the route's base fare with a weekly swing,
/// a weekend premium and Gaussian noise.
pub struct SyntheticHistory {
    rng: Mutex<StdRng>,
}

impl SyntheticHistory {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Mutex::new(seeded_rng(seed)),
        }
    }

    pub fn generate(&self, route: &Route) -> Vec<f64> {
        let base = profile(route)
            .map(|p| p.base_fare)
            .unwrap_or(UNKNOWN_ROUTE_BASE_FARE);
        let floor = base * 0.6;

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        (0..SYNTHETIC_HISTORY_DAYS)
            .map(|i| {
                let swing = (i as f64 * 0.2).sin() * 20.0;
                let noise = gaussian(&mut *rng) * 15.0;
                let weekend = if matches!(i % 7, 4..=6) { 10.0 } else { -5.0 };
                (base + swing + noise + weekend).trunc().max(floor)
            })
            .collect()
    }
}

/// Standard normal sample (Box-Muller).
fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[async_trait::async_trait]
impl HistoryProvider for SyntheticHistory {
    fn provider_name(&self) -> &'static str {
        "synthetic"
    }

    async fn history(&self, route: &Route, _days: usize) -> Result<Vec<f64>> {
        Ok(self.generate(route))
    }
}
