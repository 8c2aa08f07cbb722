pub mod audit;
pub mod baseline;
pub mod engine;
pub mod metrics;
pub mod outcomes;
pub mod series_quality;
