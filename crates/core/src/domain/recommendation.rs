use crate::domain::flight::{FlightOffer, Route};
use crate::domain::market::{BookingInsights, PriceStatistics, TrendPrediction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    BuyNow,
    Buy,
    Wait,
    Alternate,
}

impl Decision {
    pub fn label(self) -> &'static str {
        match self {
            Decision::BuyNow => "BUY NOW",
            Decision::Buy => "BUY",
            Decision::Wait => "WAIT",
            Decision::Alternate => "ALTERNATE",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the current price sits in the historical distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PricePosition {
    #[serde(rename = "bottom 10%")]
    Bottom10,
    #[serde(rename = "below median")]
    BelowMedian,
    #[serde(rename = "above median")]
    AboveMedian,
    #[serde(rename = "top 10%")]
    Top10,
}

impl PricePosition {
    pub fn as_str(self) -> &'static str {
        match self {
            PricePosition::Bottom10 => "bottom 10%",
            PricePosition::BelowMedian => "below median",
            PricePosition::AboveMedian => "above median",
            PricePosition::Top10 => "top 10%",
        }
    }
}

impl fmt::Display for PricePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub decision: Decision,
    pub confidence: f64,
    pub reason: String,
    pub price_position: PricePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationSource {
    Llm,
    Fallback,
}

/// Everything the advisor produced for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advisory {
    pub route: Route,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub budget: f64,
    pub cheapest: Option<FlightOffer>,
    pub flights: Vec<FlightOffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_flights: Option<Vec<FlightOffer>>,
    pub history_len: usize,
    pub stats: PriceStatistics,
    pub recommendation: Option<Recommendation>,
    pub trend: TrendPrediction,
    pub booking: BookingInsights,
    pub explanation: String,
    pub explanation_source: ExplanationSource,
}
