use serde::{Deserialize, Serialize};
use std::fmt;

/// Distributional summary of a route's price history.
///
/// `mean` and `std` are `None` only for the fixed fallback returned when there
/// is no history at all; see [`PriceStatistics::is_fallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStatistics {
    pub q10: i64,
    pub q50: i64,
    pub q90: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<i64>,
}

impl PriceStatistics {
    pub fn is_fallback(&self) -> bool {
        self.mean.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPrediction {
    pub trend: Trend,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_prices: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub future_avg: Option<f64>,
}

impl TrendPrediction {
    /// Result used whenever the history cannot support a fit.
    pub fn insufficient() -> Self {
        Self {
            trend: Trend::Stable,
            confidence: 0.5,
            predicted_prices: None,
            current_avg: None,
            future_avg: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertUrgency {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAlert {
    pub route: String,
    pub current_price: f64,
    pub savings: i64,
    pub alert_type: String,
    pub urgency: AlertUrgency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingInsights {
    pub best_day: String,
    pub best_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_savings: Option<i64>,
    pub confidence: f64,
}
