use chrono::{Duration, NaiveDate};
use lotwise_domain::repositories::market_data::{DailyBarQuery, MarketDataRepository};
use lotwise_domain::services::series_quality::{series_quality, trim_to_recent, SeriesQualityReport};
use lotwise_domain::value_objects::price_bar::PriceBar;
use lotwise_domain::BacktestError;

/// Calendar days added to the first query to absorb weekends and holidays.
pub const WINDOW_SLACK_DAYS: i64 = 10;

/// Upper bound on the analysis window, roughly four centuries of sessions.
pub const MAX_SESSIONS: usize = 100_000;

#[derive(Debug, Clone)]
pub struct SessionWindow {
    pub bars: Vec<PriceBar>,
    pub report: SeriesQualityReport,
    /// The first query came back short and a wider one was issued.
    pub widened: bool,
    pub query_start: NaiveDate,
    pub query_end: NaiveDate,
}

/// Most recent `sessions` daily bars ending at `end`.
///
/// Queries `sessions + 10` calendar days first. A short answer triggers one
/// wider query of `2 * sessions` days (never narrower than the first); if that
/// is still short, whatever arrived is used.
pub fn fetch_recent_sessions(
    repo: &dyn MarketDataRepository,
    symbol: &str,
    sessions: usize,
    end: NaiveDate,
) -> Result<SessionWindow, BacktestError> {
    if sessions == 0 {
        return Err(BacktestError::InvalidInput(
            "sessions must be > 0".to_string(),
        ));
    }
    if sessions > MAX_SESSIONS {
        return Err(BacktestError::InvalidInput(format!(
            "sessions must be <= {MAX_SESSIONS} (got {sessions})"
        )));
    }

    let first_span = sessions as i64 + WINDOW_SLACK_DAYS;
    let first_query = query(symbol, end, first_span)?;
    let first = match repo.load_daily(&first_query) {
        Ok((bars, report)) if bars.len() >= sessions => {
            return Ok(finish(bars, report, sessions, false, &first_query));
        }
        Ok(loaded) => Some(loaded),
        Err(BacktestError::DataUnavailable(_)) => None,
        Err(err) => return Err(err),
    };

    let wide_span = (2 * sessions as i64).max(first_span);
    let wide_query = query(symbol, end, wide_span)?;
    let window = match (repo.load_daily(&wide_query), first) {
        (Ok((bars, report)), _) if !bars.is_empty() => {
            finish(bars, report, sessions, true, &wide_query)
        }
        (Ok(_) | Err(BacktestError::DataUnavailable(_)), Some((bars, report))) => {
            finish(bars, report, sessions, true, &first_query)
        }
        (Ok(_), None) => return Err(no_bars(symbol, &wide_query)),
        (Err(err), _) => return Err(err),
    };
    if window.bars.is_empty() {
        return Err(no_bars(symbol, &wide_query));
    }
    Ok(window)
}

fn no_bars(symbol: &str, query: &DailyBarQuery) -> BacktestError {
    BacktestError::DataUnavailable(format!(
        "no daily bars for {} between {} and {}",
        symbol, query.start, query.end
    ))
}

fn query(symbol: &str, end: NaiveDate, span_days: i64) -> Result<DailyBarQuery, BacktestError> {
    let start = Duration::try_days(span_days)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| {
            BacktestError::InvalidInput(format!(
                "window of {span_days} days before {end} is outside the calendar"
            ))
        })?;
    Ok(DailyBarQuery {
        symbol: symbol.to_string(),
        start,
        end,
    })
}

fn finish(
    bars: Vec<PriceBar>,
    raw_report: SeriesQualityReport,
    sessions: usize,
    widened: bool,
    query: &DailyBarQuery,
) -> SessionWindow {
    let bars = trim_to_recent(bars, sessions);
    let mut report = series_quality(&bars);
    report.duplicates = raw_report.duplicates;
    report.first_duplicate = raw_report.first_duplicate;
    report.out_of_order += raw_report.out_of_order;
    if report.first_out_of_order.is_none() {
        report.first_out_of_order = raw_report.first_out_of_order;
    }
    SessionWindow {
        bars,
        report,
        widened,
        query_start: query.start,
        query_end: query.end,
    }
}
