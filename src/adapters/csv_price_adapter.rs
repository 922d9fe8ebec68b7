//! Daily price history from a directory of per-ticker CSV files.
//!
//! Each ticker lives in `<base_path>/<TICKER>.csv` with a `date` column and
//! either an `adj_close` or a `close` column (adjusted prices preferred).
//! Extra columns such as open/high/low/volume are ignored.

use crate::domain::prices::PriceTable;
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

const PRICE_COLUMNS: [&str; 3] = ["adj_close", "adj close", "close"];

#[derive(Debug)]
enum SeriesError {
    Read(String),
    NoPriceColumn,
    BadRow { line: usize, reason: String },
    NoRowsInRange,
    Stale,
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::Read(reason) => write!(f, "{}", reason),
            SeriesError::NoPriceColumn => write!(f, "no date/adj_close/close columns"),
            SeriesError::BadRow { line, reason } => write!(f, "line {}: {}", line, reason),
            SeriesError::NoRowsInRange => write!(f, "no observations in range"),
            SeriesError::Stale => write!(f, "price never changes over the period"),
        }
    }
}

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    /// Observations for one ticker within `[start, end]`, sorted by date.
    fn read_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, SeriesError> {
        let path = self.csv_path(ticker);
        let mut rdr = csv::Reader::from_path(&path)
            .map_err(|e| SeriesError::Read(format!("failed to read {}: {}", path.display(), e)))?;

        let headers = rdr
            .headers()
            .map_err(|e| SeriesError::Read(format!("CSV parse error: {}", e)))?
            .clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let date_col = find("date").ok_or(SeriesError::NoPriceColumn)?;
        let price_col = PRICE_COLUMNS
            .iter()
            .find_map(|name| find(*name))
            .ok_or(SeriesError::NoPriceColumn)?;

        let mut series = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| SeriesError::BadRow {
                line,
                reason: e.to_string(),
            })?;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                SeriesError::BadRow {
                    line,
                    reason: format!("invalid date format: {}", e),
                }
            })?;
            if date < start || date > end {
                continue;
            }

            let price_str = record.get(price_col).unwrap_or_default().trim();
            if price_str.is_empty() {
                continue;
            }
            let price: f64 = price_str.parse().map_err(|e| SeriesError::BadRow {
                line,
                reason: format!("invalid price value: {}", e),
            })?;
            series.push((date, price));
        }

        if series.is_empty() {
            return Err(SeriesError::NoRowsInRange);
        }
        series.sort_by_key(|(date, _)| *date);

        let first = series[0].1;
        if series.iter().all(|(_, price)| *price == first) {
            return Err(SeriesError::Stale);
        }
        Ok(series)
    }
}

impl PricePort for CsvPriceAdapter {
    fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> PriceTable {
        let mut series = HashMap::with_capacity(tickers.len());
        for ticker in tickers {
            match self.read_series(ticker, start, end) {
                Ok(observations) => {
                    series.insert(ticker.clone(), observations);
                }
                Err(e) => {
                    warn!("Price fetch failed for {} ({} -> {}): {}", ticker, start, end, e);
                    return PriceTable::empty();
                }
            }
        }

        let table = PriceTable::align(tickers, &series, start, end);
        debug!(
            "Aligned {} tickers over {} shared dates ({} -> {})",
            tickers.len(),
            table.len(),
            start,
            end
        );
        table
    }
}
