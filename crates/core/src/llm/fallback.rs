use crate::domain::recommendation::Decision;
use crate::llm::ExplainInput;
use crate::pricing::policy::money;

pub const NO_FLIGHTS: &str =
    "No flights found for this route. Try different dates or nearby airports.";

/// Offline explanation keyed purely by the decision.
pub fn explain(input: &ExplainInput) -> String {
    let (Some(price), Some(rec)) = (input.cheapest_price, input.recommendation.as_ref()) else {
        return NO_FLIGHTS.to_string();
    };

    let price = money(price);
    let (q10, q90) = (input.stats.q10, input.stats.q90);
    match rec.decision {
        Decision::BuyNow => format!(
            "Great deal! At ${price}, this is significantly below the typical range of ${q10}-${q90}. \
             Book soon as prices this low don't last long."
        ),
        Decision::Buy => format!(
            "Good price at ${price}. This is below the median price and within a reasonable range. \
             Consider booking if it fits your budget."
        ),
        Decision::Wait => format!(
            "Current price of ${price} is above average. Historical data suggests waiting a few days \
             or being flexible with dates could save you money."
        ),
        Decision::Alternate => format!(
            "Price of ${price} is quite high compared to typical range of ${q10}-${q90}. \
             Consider different dates, nearby airports, or alternative routes."
        ),
    }
}
