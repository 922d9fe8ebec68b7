//! PE history loaded from a long-format CSV file.
//!
//! Expected header (case-insensitive, any column order): `ticker,date,pe`.
//! Blank or `NaN` PE cells are dropped, as are non-positive multiples.
//! Malformed dates and non-numeric PE values are hard errors, because they
//! point at a broken export rather than a missing observation.

use crate::domain::error::ValueScreenError;
use crate::domain::fundamentals::FundamentalsTable;
use crate::ports::fundamentals_port::FundamentalsPort;
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct CsvFundamentalsAdapter;

impl CsvFundamentalsAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, ValueScreenError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| ValueScreenError::Data {
            reason: format!("fundamentals file has no '{}' column", name),
        })
}

fn is_blank_pe(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("nan") || v.eq_ignore_ascii_case("n/a")
}

impl FundamentalsPort for CsvFundamentalsAdapter {
    fn load(&self, path: &Path) -> Result<FundamentalsTable, ValueScreenError> {
        let mut rdr = csv::Reader::from_path(path).map_err(|e| ValueScreenError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let headers = rdr.headers()?.clone();
        let ticker_col = column(&headers, "ticker")?;
        let date_col = column(&headers, "date")?;
        let pe_col = column(&headers, "pe")?;

        let mut table = FundamentalsTable::new();
        let mut dropped = 0usize;

        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            // Header is line 1.
            let line = line + 2;

            let ticker = record.get(ticker_col).map(str::trim).unwrap_or_default();
            if ticker.is_empty() {
                dropped += 1;
                continue;
            }

            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                ValueScreenError::Data {
                    reason: format!("line {}: invalid date '{}': {}", line, date_str, e),
                }
            })?;

            let pe_str = record.get(pe_col).unwrap_or_default();
            if is_blank_pe(pe_str) {
                dropped += 1;
                continue;
            }
            let pe: f64 = pe_str.trim().parse().map_err(|e| ValueScreenError::Data {
                reason: format!("line {}: invalid PE value '{}': {}", line, pe_str.trim(), e),
            })?;

            if !table.insert(ticker, date, pe) {
                dropped += 1;
            }
        }

        debug!("Dropped {} fundamentals rows without a usable PE", dropped);
        info!(
            "Loaded {} PE observations for {} tickers from {}",
            table.observation_count(),
            table.ticker_count(),
            path.display()
        );
        Ok(table)
    }
}
