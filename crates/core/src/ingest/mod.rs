pub mod provider;
pub mod synthetic;
pub mod types;
