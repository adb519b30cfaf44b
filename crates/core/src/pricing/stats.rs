use crate::domain::market::PriceStatistics;

/// Returned when there is no usable history. This is a policy default, not a
/// distribution derived from data.
pub const FALLBACK_STATS: PriceStatistics = PriceStatistics {
    q10: 200,
    q50: 250,
    q90: 300,
    mean: None,
    std: None,
};

/// Summarizes a price history into truncated quantiles, mean and population
/// standard deviation.
///
/// Non-finite samples are dropped first. An empty (or all non-finite) history
/// yields [`FALLBACK_STATS`].
pub fn summarize(history: &[f64]) -> PriceStatistics {
    let mut sorted: Vec<f64> = history.iter().copied().filter(|p| p.is_finite()).collect();
    if sorted.is_empty() {
        return FALLBACK_STATS;
    }
    sorted.sort_by(f64::total_cmp);

    let mean = super::mean(&sorted);
    let variance =
        sorted.iter().map(|p| (p - mean) * (p - mean)).sum::<f64>() / sorted.len() as f64;

    PriceStatistics {
        q10: percentile(&sorted, 10.0) as i64,
        q50: percentile(&sorted, 50.0) as i64,
        q90: percentile(&sorted, 90.0) as i64,
        mean: Some(mean as i64),
        std: Some(variance.sqrt() as i64),
    }
}

/// Linear-interpolation percentile over an ascending, non-empty slice.
///
/// The virtual rank is `p/100 * (n-1)`. When the fractional part is at least
/// one half the value is interpolated back from the upper neighbour, which
/// keeps results identical to numpy's default method.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = (p / 100.0) * last as f64;
    let lo = (rank.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let t = rank - lo as f64;
    lerp(sorted[lo], sorted[hi], t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}
