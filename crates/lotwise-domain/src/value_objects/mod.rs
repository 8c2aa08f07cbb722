pub mod bar_record;
pub mod price_bar;
pub mod price_series;
pub mod strategy_params;
pub mod trade;
