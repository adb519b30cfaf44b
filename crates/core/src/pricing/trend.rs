use crate::domain::market::{Trend, TrendPrediction};

pub const DEFAULT_HORIZON_DAYS: usize = 7;

/// Histories shorter than this never get a fitted projection.
pub const MIN_HISTORY_FOR_FIT: usize = 10;

const RECENT_WINDOW: usize = 7;
const MAX_FIT_CONFIDENCE: f64 = 0.8;
const STABLE_CONFIDENCE: f64 = 0.6;

/// Projects the next `horizon_days` prices with a linear fit over the history
/// and classifies the direction against the last week's average.
///
/// Advisory only: any degenerate input falls back to
/// [`TrendPrediction::insufficient`] instead of failing.
pub fn predict(history: &[f64], horizon_days: usize) -> TrendPrediction {
    if history.len() < MIN_HISTORY_FOR_FIT || horizon_days == 0 {
        return TrendPrediction::insufficient();
    }
    if history.iter().any(|p| !p.is_finite()) {
        return TrendPrediction::insufficient();
    }

    let Some(fit) = LinearFit::fit(history) else {
        return TrendPrediction::insufficient();
    };

    let n = history.len();
    let predicted: Vec<f64> = (n..n + horizon_days).map(|i| fit.predict(i)).collect();

    let current_avg = super::mean(&history[n - RECENT_WINDOW..]);
    let future_avg = super::mean(&predicted);
    if !current_avg.is_finite() || !future_avg.is_finite() {
        return TrendPrediction::insufficient();
    }

    let (trend, confidence) = if future_avg > current_avg * 1.05 {
        (Trend::Increasing, fit.r2.abs().min(MAX_FIT_CONFIDENCE))
    } else if future_avg < current_avg * 0.95 {
        (Trend::Decreasing, fit.r2.abs().min(MAX_FIT_CONFIDENCE))
    } else {
        (Trend::Stable, STABLE_CONFIDENCE)
    };

    TrendPrediction {
        trend,
        confidence,
        predicted_prices: Some(predicted),
        current_avg: Some(current_avg),
        future_avg: Some(future_avg),
    }
}

/// Short-horizon momentum: the last five samples against the five before.
pub fn recent_momentum(history: &[f64]) -> Trend {
    let n = history.len();
    if n < 5 {
        return Trend::Stable;
    }

    let recent = super::mean(&history[n - 5..]);
    let older = if n >= 10 {
        super::mean(&history[n - 10..n - 5])
    } else {
        recent
    };

    if recent > older * 1.1 {
        Trend::Increasing
    } else if recent < older * 0.9 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Ordinary least squares of price against a standardized day index.
#[derive(Debug, Clone, Copy)]
struct LinearFit {
    index_mean: f64,
    index_scale: f64,
    intercept: f64,
    slope: f64,
    r2: f64,
}

impl LinearFit {
    fn fit(y: &[f64]) -> Option<Self> {
        let n = y.len() as f64;
        let index_mean = (n - 1.0) / 2.0;
        let index_var = (0..y.len())
            .map(|i| (i as f64 - index_mean).powi(2))
            .sum::<f64>()
            / n;
        let index_scale = index_var.sqrt();
        if !(index_scale > 0.0) {
            return None;
        }

        let z = |i: usize| (i as f64 - index_mean) / index_scale;
        let y_mean = super::mean(y);

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (i, &yi) in y.iter().enumerate() {
            let zi = z(i);
            sxy += zi * (yi - y_mean);
            sxx += zi * zi;
        }
        if !(sxx > 0.0) {
            return None;
        }

        // z has zero mean, so the intercept is the mean price.
        let slope = sxy / sxx;
        let intercept = y_mean;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (i, &yi) in y.iter().enumerate() {
            let fitted = intercept + slope * z(i);
            ss_res += (yi - fitted).powi(2);
            ss_tot += (yi - y_mean).powi(2);
        }
        let r2 = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        let fit = Self {
            index_mean,
            index_scale,
            intercept,
            slope,
            r2,
        };
        (fit.slope.is_finite() && fit.r2.is_finite()).then_some(fit)
    }

    fn predict(&self, index: usize) -> f64 {
        self.intercept + self.slope * ((index as f64 - self.index_mean) / self.index_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn short_history_is_stable_without_series() {
        for len in 0..MIN_HISTORY_FOR_FIT {
            let history = linear(len, 100.0, 50.0);
            let p = predict(&history, DEFAULT_HORIZON_DAYS);
            assert_eq!(p, TrendPrediction::insufficient());
            assert_eq!(p.trend, Trend::Stable);
            assert_eq!(p.confidence, 0.5);
            assert!(p.predicted_prices.is_none());
        }
    }

    #[test]
    fn rising_line_projects_exactly() {
        let history = linear(10, 100.0, 10.0);
        let p = predict(&history, DEFAULT_HORIZON_DAYS);

        let projected = p.predicted_prices.as_ref().unwrap();
        assert_eq!(projected.len(), 7);
        for (k, v) in projected.iter().enumerate() {
            let expected = 100.0 + 10.0 * (10 + k) as f64;
            assert!((v - expected).abs() < 1e-9, "{v} vs {expected}");
        }

        // last 7: 130..=190 -> 160; projected 200..=260 -> 230
        assert!((p.current_avg.unwrap() - 160.0).abs() < 1e-9);
        assert!((p.future_avg.unwrap() - 230.0).abs() < 1e-9);
        assert_eq!(p.trend, Trend::Increasing);
        // perfect fit, capped
        assert_eq!(p.confidence, 0.8);
    }

    #[test]
    fn falling_line_is_decreasing() {
        let history = linear(20, 400.0, -8.0);
        let p = predict(&history, DEFAULT_HORIZON_DAYS);
        assert_eq!(p.trend, Trend::Decreasing);
        assert_eq!(p.confidence, 0.8);
    }

    #[test]
    fn flat_history_is_stable() {
        let history = vec![250.0; 15];
        let p = predict(&history, DEFAULT_HORIZON_DAYS);
        assert_eq!(p.trend, Trend::Stable);
        assert_eq!(p.confidence, 0.6);
        assert_eq!(p.current_avg, Some(250.0));
        assert_eq!(p.future_avg, Some(250.0));
    }

    #[test]
    fn noisy_fit_caps_confidence_by_r2() {
        // Upward drift with heavy alternating noise: weak fit.
        let history: Vec<f64> = (0..30)
            .map(|i| 200.0 + 6.0 * i as f64 + if i % 2 == 0 { 90.0 } else { -90.0 })
            .collect();
        let p = predict(&history, DEFAULT_HORIZON_DAYS);
        assert_eq!(p.trend, Trend::Increasing);
        assert!(p.confidence > 0.0 && p.confidence < 0.8, "{}", p.confidence);
    }

    #[test]
    fn honours_custom_horizon() {
        let history = linear(12, 100.0, 1.0);
        let p = predict(&history, 3);
        assert_eq!(p.predicted_prices.map(|v| v.len()), Some(3));
    }

    #[test]
    fn degenerate_inputs_fall_back() {
        let mut history = linear(12, 100.0, 1.0);
        assert_eq!(predict(&history, 0), TrendPrediction::insufficient());
        history[3] = f64::NAN;
        assert_eq!(predict(&history, 7), TrendPrediction::insufficient());
    }

    #[test]
    fn predict_is_idempotent() {
        let history = linear(25, 300.0, -2.5);
        assert_eq!(predict(&history, 7), predict(&history, 7));
    }

    #[test]
    fn momentum_compares_last_two_blocks_of_five() {
        assert_eq!(recent_momentum(&[100.0; 4]), Trend::Stable);
        assert_eq!(recent_momentum(&[100.0; 7]), Trend::Stable);

        let mut rising = vec![100.0; 5];
        rising.extend([120.0; 5]);
        assert_eq!(recent_momentum(&rising), Trend::Increasing);

        let mut falling = vec![100.0; 5];
        falling.extend([80.0; 5]);
        assert_eq!(recent_momentum(&falling), Trend::Decreasing);
    }
}
