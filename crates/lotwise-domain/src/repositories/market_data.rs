use crate::error::BacktestError;
use crate::services::series_quality::SeriesQualityReport;
use crate::value_objects::price_bar::PriceBar;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBarQuery {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Source of daily bars. Implementations return bars ascending with duplicate
/// dates collapsed and report any fetch failure as `DataUnavailable`.
pub trait MarketDataRepository {
    fn load_daily(
        &self,
        query: &DailyBarQuery,
    ) -> Result<(Vec<PriceBar>, SeriesQualityReport), BacktestError>;
}
