use crate::domain::flight::Route;
use crate::domain::market::{AlertUrgency, MarketAlert};

/// Fires when the current minimum is more than 20% under the historical mean.
const ALERT_RATIO: f64 = 0.8;
/// More than 30% under the mean is urgent.
const HIGH_URGENCY_RATIO: f64 = 0.7;

pub const PRICE_DROP: &str = "price_drop";

pub fn scan_alert(route: &Route, current_min: f64, history: &[f64]) -> Option<MarketAlert> {
    if history.is_empty() || !current_min.is_finite() {
        return None;
    }
    let avg = super::mean(history);
    if !avg.is_finite() || current_min >= avg * ALERT_RATIO {
        return None;
    }

    let urgency = if current_min < avg * HIGH_URGENCY_RATIO {
        AlertUrgency::High
    } else {
        AlertUrgency::Medium
    };

    Some(MarketAlert {
        route: route.key(),
        current_price: current_min,
        savings: (avg - current_min) as i64,
        alert_type: PRICE_DROP.to_string(),
        urgency,
    })
}
