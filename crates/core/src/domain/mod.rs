pub mod flight;
pub mod market;
pub mod recommendation;
