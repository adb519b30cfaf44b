//! Pure pricing engine: history summaries, the buy/wait policy and trend
//! projection. Nothing in here performs I/O.

pub mod alerts;
pub mod booking;
pub mod error;
pub mod policy;
pub mod stats;
pub mod trend;

pub use error::InvalidInput;
pub use policy::decide;
pub use stats::summarize;
pub use trend::{predict, DEFAULT_HORIZON_DAYS};

/// Rejects quotes the policy has no defined answer for.
///
/// [`decide`] itself is total; callers that accept untrusted numbers run this
/// first.
pub fn validate_quote(current_price: f64, budget: f64) -> Result<(), InvalidInput> {
    if !current_price.is_finite() || current_price < 0.0 {
        return Err(InvalidInput::new(
            "current_price",
            format!("must be finite and non-negative (got {current_price})"),
        ));
    }
    validate_budget(budget)
}

pub fn validate_budget(budget: f64) -> Result<(), InvalidInput> {
    if !budget.is_finite() || budget <= 0.0 {
        return Err(InvalidInput::new(
            "budget",
            format!("must be finite and positive (got {budget})"),
        ));
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_quote_accepts_ordinary_values() {
        assert!(validate_quote(0.0, 1.0).is_ok());
        assert!(validate_quote(250.0, 300.0).is_ok());
    }

    #[test]
    fn validate_quote_rejects_degenerate_values() {
        assert_eq!(validate_quote(f64::NAN, 300.0).unwrap_err().field, "current_price");
        assert_eq!(validate_quote(-1.0, 300.0).unwrap_err().field, "current_price");
        assert_eq!(validate_quote(100.0, 0.0).unwrap_err().field, "budget");
        assert_eq!(validate_quote(100.0, -5.0).unwrap_err().field, "budget");
        assert_eq!(validate_quote(100.0, f64::INFINITY).unwrap_err().field, "budget");
    }
}
