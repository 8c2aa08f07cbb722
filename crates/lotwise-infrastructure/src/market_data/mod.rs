pub mod csv_daily;

pub use csv_daily::CsvMarketDataRepository;
