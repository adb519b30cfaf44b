use crate::domain::market::BookingInsights;

/// Fewer samples than this and the weekday pattern is not trusted.
pub const MIN_HISTORY_FOR_PATTERN: usize = 30;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const BEST_TIME: &str = "3PM";

pub fn default_insights() -> BookingInsights {
    BookingInsights {
        best_day: "Tuesday".to_string(),
        best_time: BEST_TIME.to_string(),
        avg_savings: None,
        confidence: 0.5,
    }
}

/// Cheapest weekday to book, treating sample `i` as weekday `i % 7`
/// (0 = Monday).
pub fn booking_insights(history: &[f64]) -> BookingInsights {
    if history.len() < MIN_HISTORY_FOR_PATTERN {
        return default_insights();
    }

    let mut sums = [0.0f64; 7];
    let mut counts = [0usize; 7];
    for (i, price) in history.iter().enumerate() {
        sums[i % 7] += price;
        counts[i % 7] += 1;
    }

    let day_means: Vec<f64> = sums
        .iter()
        .zip(counts)
        .map(|(sum, count)| sum / count as f64)
        .collect();
    if day_means.iter().any(|m| !m.is_finite()) {
        return default_insights();
    }

    // First day wins ties.
    let mut best = 0;
    for (day, mean) in day_means.iter().enumerate() {
        if *mean < day_means[best] {
            best = day;
        }
    }
    let worst = day_means.iter().copied().fold(f64::MIN, f64::max);

    BookingInsights {
        best_day: DAY_NAMES[best].to_string(),
        best_time: BEST_TIME.to_string(),
        avg_savings: Some((worst - day_means[best]) as i64),
        confidence: 0.7,
    }
}
