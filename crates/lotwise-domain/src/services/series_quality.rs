use crate::value_objects::price_bar::PriceBar;
use chrono::NaiveDate;
use serde::Serialize;

/// Diagnostic counts over raw bars. Never used to repair data; the engine still
/// rejects any series this report flags.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SeriesQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub ohlc_violations: usize,
    pub non_positive_prices: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub first_duplicate: Option<NaiveDate>,
    pub first_out_of_order: Option<NaiveDate>,
    pub first_ohlc_violation: Option<NaiveDate>,
    pub max_calendar_gap_days: Option<i64>,
}

impl SeriesQualityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates == 0
            && self.out_of_order == 0
            && self.ohlc_violations == 0
            && self.non_positive_prices == 0
    }
}

pub fn series_quality(bars: &[PriceBar]) -> SeriesQualityReport {
    let mut report = SeriesQualityReport {
        rows: bars.len(),
        ..SeriesQualityReport::default()
    };
    if bars.is_empty() {
        return report;
    }

    report.first_date = Some(bars[0].date);
    report.last_date = Some(bars[bars.len() - 1].date);

    let mut last_date: Option<NaiveDate> = None;
    let mut max_gap: Option<i64> = None;

    for bar in bars {
        if !bar.prices_positive() {
            report.non_positive_prices += 1;
        } else if !bar.ohlc_consistent() {
            report.ohlc_violations += 1;
            if report.first_ohlc_violation.is_none() {
                report.first_ohlc_violation = Some(bar.date);
            }
        }

        if let Some(prev) = last_date {
            if bar.date == prev {
                report.duplicates += 1;
                if report.first_duplicate.is_none() {
                    report.first_duplicate = Some(bar.date);
                }
            } else if bar.date < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(bar.date);
                }
            } else {
                let gap = (bar.date - prev).num_days();
                max_gap = Some(max_gap.map_or(gap, |current| current.max(gap)));
            }
        }

        last_date = Some(bar.date);
    }

    report.max_calendar_gap_days = max_gap;
    report
}

/// Keeps the most recent `sessions` bars.
pub fn trim_to_recent(mut bars: Vec<PriceBar>, sessions: usize) -> Vec<PriceBar> {
    if bars.len() > sessions {
        bars.drain(..bars.len() - sessions);
    }
    bars
}
