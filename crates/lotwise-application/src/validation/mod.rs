use crate::acquisition::fetch_recent_sessions;
use crate::config::Config;
use chrono::NaiveDate;
use lotwise_domain::repositories::market_data::MarketDataRepository;
use lotwise_domain::services::series_quality::SeriesQualityReport;
use lotwise_domain::value_objects::price_series::PriceSeries;
use serde::Serialize;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub run_id: String,
    pub symbol: String,
    pub strict: bool,
    pub sessions_requested: usize,
    pub bars: usize,
    pub short_window: bool,
    pub widened_window: bool,
    pub query_start: NaiveDate,
    pub query_end: NaiveDate,
    pub quality: SeriesQualityReport,
    pub series_accepted: bool,
    pub series_error: Option<String>,
}

impl ValidationReport {
    pub fn has_findings(&self) -> bool {
        self.short_window || !self.series_accepted || !self.quality.is_clean()
    }
}

/// Checks parameters, fetches the analysis window and reports whether the
/// engine would accept it. `strict` turns any finding into an error.
pub fn validate(
    config: &Config,
    market_data: &dyn MarketDataRepository,
    strict: bool,
) -> Result<ValidationReport, String> {
    let _span = info_span!(
        "validate",
        strict = strict,
        run_id = %config.run.run_id,
        symbol = %config.run.symbol
    )
    .entered();

    config
        .strategy_parameters()
        .validate()
        .map_err(|err| err.to_string())?;

    let stage_start = Instant::now();
    let window = fetch_recent_sessions(
        market_data,
        &config.run.symbol,
        config.run.sessions,
        config.end_date(),
    )
    .map_err(|err| err.to_string())?;
    metrics::histogram!("lotwise.validate.fetch_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let bars = window.bars.len();
    let (series_accepted, series_error) = match PriceSeries::new(window.bars) {
        Ok(_) => (true, None),
        Err(err) => (false, Some(err.to_string())),
    };

    let report = ValidationReport {
        run_id: config.run.run_id.clone(),
        symbol: config.run.symbol.clone(),
        strict,
        sessions_requested: config.run.sessions,
        bars,
        short_window: bars < config.run.sessions,
        widened_window: window.widened,
        query_start: window.query_start,
        query_end: window.query_end,
        quality: window.report,
        series_accepted,
        series_error,
    };

    metrics::gauge!("lotwise.validate.bars").set(report.bars as f64);
    metrics::gauge!("lotwise.validate.duplicates").set(report.quality.duplicates as f64);
    metrics::gauge!("lotwise.validate.ohlc_violations").set(report.quality.ohlc_violations as f64);

    if strict && report.has_findings() {
        return Err(format!(
            "strict validation failed: bars={} of {}, duplicates={}, out_of_order={}, ohlc_violations={}, non_positive_prices={}{}",
            report.bars,
            report.sessions_requested,
            report.quality.duplicates,
            report.quality.out_of_order,
            report.quality.ohlc_violations,
            report.quality.non_positive_prices,
            report
                .series_error
                .as_deref()
                .map(|err| format!(", series rejected: {err}"))
                .unwrap_or_default(),
        ));
    }

    Ok(report)
}
