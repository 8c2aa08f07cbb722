pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use error::BacktestError;
pub use services::engine::{run, BacktestEngine, BacktestOutcome};

pub fn engine_name() -> &'static str {
    "lotwise"
}
