use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lotwise_domain::repositories::market_data::{DailyBarQuery, MarketDataRepository};
use lotwise_domain::services::series_quality::{series_quality, SeriesQualityReport};
use lotwise_domain::value_objects::price_bar::PriceBar;
use lotwise_domain::BacktestError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct DailyBarRecord {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Daily bars from `date,open,high,low,close,volume` CSV files. A `{symbol}`
/// placeholder in the path template is replaced by the queried symbol.
#[derive(Debug, Clone)]
pub struct CsvMarketDataRepository {
    path_template: String,
}

impl CsvMarketDataRepository {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
        }
    }

    pub fn resolve_path(&self, symbol: &str) -> PathBuf {
        PathBuf::from(self.path_template.replace("{symbol}", symbol))
    }
}

impl MarketDataRepository for CsvMarketDataRepository {
    fn load_daily(
        &self,
        query: &DailyBarQuery,
    ) -> Result<(Vec<PriceBar>, SeriesQualityReport), BacktestError> {
        let path = self.resolve_path(&query.symbol);
        let (bars, raw_report) = load_csv(&path).map_err(BacktestError::DataUnavailable)?;

        let window: Vec<PriceBar> = bars
            .into_iter()
            .filter(|bar| bar.date >= query.start && bar.date <= query.end)
            .collect();
        if window.is_empty() {
            return Err(BacktestError::DataUnavailable(format!(
                "no daily bars for {} between {} and {} in {}",
                query.symbol,
                query.start,
                query.end,
                path.display()
            )));
        }

        let mut report = series_quality(&window);
        report.duplicates = raw_report.duplicates;
        report.first_duplicate = raw_report.first_duplicate;
        report.out_of_order = raw_report.out_of_order;
        report.first_out_of_order = raw_report.first_out_of_order;

        metrics::counter!("lotwise.market_data.rows_loaded").increment(window.len() as u64);
        tracing::debug!(
            symbol = %query.symbol,
            path = %path.display(),
            start = %query.start,
            end = %query.end,
            rows = window.len(),
            "loaded daily bars"
        );
        Ok((window, report))
    }
}

/// Reads every row, sorted by date; a repeated date keeps the last row seen.
/// Ordering and duplicate findings are counted in file order.
pub fn load_csv(path: &Path) -> Result<(Vec<PriceBar>, SeriesQualityReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open daily bar CSV {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut bars_by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
    let mut report = SeriesQualityReport::default();
    let mut last_seen: Option<NaiveDate> = None;

    for result in reader.deserialize::<DailyBarRecord>() {
        let record = result.map_err(|err| {
            format!("failed to parse CSV row in {}: {}", path.display(), err)
        })?;
        let date = parse_date(&record.date)?;

        if let Some(prev) = last_seen {
            if date < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(date);
                }
            }
        }
        last_seen = Some(date);

        let bar = PriceBar {
            date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        };
        if bars_by_date.insert(date, bar).is_some() {
            report.duplicates += 1;
            if report.first_duplicate.is_none() {
                report.first_duplicate = Some(date);
            }
        }
    }

    let bars: Vec<PriceBar> = bars_by_date.into_values().collect();
    let canonical = series_quality(&bars);
    report.rows = canonical.rows;
    report.ohlc_violations = canonical.ohlc_violations;
    report.first_ohlc_violation = canonical.first_ohlc_violation;
    report.non_positive_prices = canonical.non_positive_prices;
    report.first_date = canonical.first_date;
    report.last_date = canonical.last_date;
    report.max_calendar_gap_days = canonical.max_calendar_gap_days;

    Ok((bars, report))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.date());
    }

    Err(format!("unsupported date format: {}", value))
}

#[cfg(test)]
mod tests {
    use super::{load_csv, parse_date, CsvMarketDataRepository};
    use chrono::NaiveDate;
    use lotwise_domain::repositories::market_data::{DailyBarQuery, MarketDataRepository};
    use lotwise_domain::BacktestError;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_tmp_path(name: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("lotwise_{name}_{}_{}", std::process::id(), now))
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn load_csv_sorts_and_collapses_duplicates() {
        let tmp_path = unique_tmp_path("daily.csv");
        let csv_data = "date,open,high,low,close,volume\n\
2024-01-03,10,11,9,10.5,100\n\
2024-01-02,9,10,8,9.5,100\n\
2024-01-03,10,12,9,11,200\n";
        fs::write(&tmp_path, csv_data).expect("write csv");

        let (bars, report) = load_csv(&tmp_path).expect("load csv");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, ymd(2024, 1, 2));
        assert!((bars[1].close - 11.0).abs() < 1e-9);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.out_of_order, 1);
        assert_eq!(report.rows, 2);
    }

    #[test]
    fn repository_filters_window_and_substitutes_symbol() {
        let dir = unique_tmp_path("repo");
        fs::create_dir_all(&dir).expect("dir");
        fs::write(
            dir.join("600000.csv"),
            "date,open,high,low,close,volume\n\
20240102,10,10,10,10,1\n\
20240103,10,10,10,10,1\n\
20240104,10,10,10,10,1\n",
        )
        .expect("write csv");

        let template = format!("{}/{{symbol}}.csv", dir.display());
        let repo = CsvMarketDataRepository::new(template);
        let (bars, report) = repo
            .load_daily(&DailyBarQuery {
                symbol: "600000".to_string(),
                start: ymd(2024, 1, 3),
                end: ymd(2024, 1, 31),
            })
            .expect("load");
        assert_eq!(bars.len(), 2);
        assert_eq!(report.first_date, Some(ymd(2024, 1, 3)));
        assert!(report.is_clean());
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let repo = CsvMarketDataRepository::new("/nonexistent/lotwise/{symbol}.csv");
        let err = repo
            .load_daily(&DailyBarQuery {
                symbol: "000001".to_string(),
                start: ymd(2024, 1, 1),
                end: ymd(2024, 2, 1),
            })
            .expect_err("missing file");
        assert!(matches!(err, BacktestError::DataUnavailable(_)));
        assert!(err.to_string().contains("/nonexistent/lotwise/000001.csv"));
    }

    #[test]
    fn parse_date_accepts_common_layouts() {
        assert_eq!(parse_date("2024-06-28").expect("iso"), ymd(2024, 6, 28));
        assert_eq!(parse_date("20240628").expect("compact"), ymd(2024, 6, 28));
        assert_eq!(
            parse_date("2024-06-28T00:00:00Z").expect("rfc3339"),
            ymd(2024, 6, 28)
        );
        assert!(parse_date("28/06/2024").is_err());
    }
}
