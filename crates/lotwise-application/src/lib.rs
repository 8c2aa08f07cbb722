pub mod acquisition;
pub mod backtesting;
pub mod config;
pub mod experiments;
pub mod reporting;
pub mod shared;
pub mod validation;
