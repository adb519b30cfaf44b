use crate::domain::flight::FlightOffer;
use serde::{Deserialize, Serialize};

/// Response body of the flight search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSearchResponse {
    pub origin: String,
    pub destination: String,
    pub date: chrono::NaiveDate,
    #[serde(default)]
    pub currency: Option<String>,
    pub flights: Vec<FlightOffer>,
}
