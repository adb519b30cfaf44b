use crate::domain::market::PriceStatistics;
use crate::domain::recommendation::{Decision, PricePosition, Recommendation};

/// Prices above `budget * BUDGET_TOLERANCE` force an ALTERNATE decision.
pub const BUDGET_TOLERANCE: f64 = 1.2;

/// Maps a quote onto a decision.
///
/// Two stages, always in this order:
/// 1. [`rule_chain`] places the price in the historical distribution.
/// 2. [`apply_budget_override`] forces ALTERNATE when the price is far over
///    budget, keeping stage 1's confidence and position.
///
/// Total for any finite `current_price`. With `budget <= 0` every positive
/// price trips the override; use [`super::validate_quote`] to reject that up
/// front.
pub fn decide(current_price: f64, stats: &PriceStatistics, budget: f64) -> Recommendation {
    let rec = rule_chain(current_price, stats, budget);
    apply_budget_override(rec, current_price, budget)
}

/// Stage 1: first matching rule wins.
pub fn rule_chain(current_price: f64, stats: &PriceStatistics, budget: f64) -> Recommendation {
    let price = money(current_price);

    if current_price <= stats.q10 as f64 {
        Recommendation {
            decision: Decision::BuyNow,
            confidence: 0.9,
            reason: format!(
                "Excellent deal! Current price ${price} is in bottom 10% of historical prices."
            ),
            price_position: PricePosition::Bottom10,
        }
    } else if current_price <= stats.q50 as f64 {
        let decision = if current_price <= budget {
            Decision::Buy
        } else {
            Decision::Wait
        };
        Recommendation {
            decision,
            confidence: 0.7,
            reason: format!("Good price at ${price}, below median of ${}.", stats.q50),
            price_position: PricePosition::BelowMedian,
        }
    } else if current_price <= stats.q90 as f64 {
        Recommendation {
            decision: Decision::Wait,
            confidence: 0.6,
            reason: format!(
                "Price ${price} is above median. Consider waiting or flexible dates."
            ),
            price_position: PricePosition::AboveMedian,
        }
    } else {
        Recommendation {
            decision: Decision::Alternate,
            confidence: 0.8,
            reason: format!(
                "Price ${price} is in top 10%. Try different dates or nearby airports."
            ),
            price_position: PricePosition::Top10,
        }
    }
}

/// Stage 2: re-checked unconditionally after the rule chain.
pub fn apply_budget_override(
    mut rec: Recommendation,
    current_price: f64,
    budget: f64,
) -> Recommendation {
    if current_price > budget * BUDGET_TOLERANCE {
        rec.decision = Decision::Alternate;
        rec.reason
            .push_str(&format!(" Significantly over budget of ${}.", money(budget)));
    }
    rec
}

/// Whole amounts print without decimals, everything else with two.
pub(crate) fn money(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(q10: i64, q50: i64, q90: i64) -> PriceStatistics {
        PriceStatistics {
            q10,
            q50,
            q90,
            mean: None,
            std: None,
        }
    }

    #[test]
    fn price_at_q10_is_bottom_decile() {
        let rec = decide(100.0, &stats(100, 200, 300), 500.0);
        assert_eq!(rec.decision, Decision::BuyNow);
        assert_eq!(rec.confidence, 0.9);
        assert_eq!(rec.price_position, PricePosition::Bottom10);
        assert_eq!(
            rec.reason,
            "Excellent deal! Current price $100 is in bottom 10% of historical prices."
        );
    }

    #[test]
    fn below_median_buys_within_budget() {
        let rec = decide(150.0, &stats(100, 200, 300), 160.0);
        assert_eq!(rec.decision, Decision::Buy);
        assert_eq!(rec.confidence, 0.7);
        assert_eq!(rec.price_position, PricePosition::BelowMedian);
        assert_eq!(rec.reason, "Good price at $150, below median of $200.");
    }

    #[test]
    fn below_median_waits_when_over_budget_but_within_tolerance() {
        // 150 > 140 (budget) but 150 <= 168 (budget * 1.2): no override.
        let rec = decide(150.0, &stats(100, 200, 300), 140.0);
        assert_eq!(rec.decision, Decision::Wait);
        assert_eq!(rec.confidence, 0.7);
        assert_eq!(rec.price_position, PricePosition::BelowMedian);
    }

    #[test]
    fn budget_override_beats_rule_chain() {
        let rec = decide(250.0, &stats(100, 200, 300), 100.0);
        assert_eq!(rec.decision, Decision::Alternate);
        // Stage 1 placed it above median with WAIT; those values survive.
        assert_eq!(rec.confidence, 0.6);
        assert_eq!(rec.price_position, PricePosition::AboveMedian);
        assert!(rec.reason.ends_with(" Significantly over budget of $100."));
    }

    #[test]
    fn above_q90_is_alternate_without_override() {
        let rec = decide(350.0, &stats(100, 200, 300), 1000.0);
        assert_eq!(rec.decision, Decision::Alternate);
        assert_eq!(rec.confidence, 0.8);
        assert_eq!(rec.price_position, PricePosition::Top10);
        assert!(!rec.reason.contains("over budget"));
    }

    #[test]
    fn override_applies_even_to_bottom_decile() {
        let rec = decide(100.0, &stats(150, 200, 300), 50.0);
        assert_eq!(rec.decision, Decision::Alternate);
        assert_eq!(rec.confidence, 0.9);
        assert_eq!(rec.price_position, PricePosition::Bottom10);
    }

    #[test]
    fn override_boundary_is_strict() {
        // 120 == 100 * 1.2 is not over tolerance.
        let rec = decide(120.0, &stats(100, 200, 300), 100.0);
        assert_eq!(rec.decision, Decision::Wait);
        let rec = decide(120.5, &stats(100, 200, 300), 100.0);
        assert_eq!(rec.decision, Decision::Alternate);
    }

    #[test]
    fn fractional_prices_render_with_cents() {
        let rec = decide(99.5, &stats(100, 200, 300), 500.0);
        assert!(rec.reason.contains("$99.50"));
    }

    #[test]
    fn decide_is_idempotent() {
        let s = stats(180, 240, 310);
        assert_eq!(decide(260.0, &s, 220.0), decide(260.0, &s, 220.0));
    }
}
