//! Sector classification from a `ticker,sector` CSV file.

use crate::domain::error::ValueScreenError;
use crate::domain::sector::UNKNOWN_SECTOR;
use crate::ports::sector_port::SectorPort;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct CsvSectorAdapter {
    sectors: HashMap<String, String>,
}

impl CsvSectorAdapter {
    /// An adapter that classifies every ticker as unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self, ValueScreenError> {
        let mut rdr = csv::Reader::from_path(path).map_err(|e| ValueScreenError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let headers = rdr.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| ValueScreenError::Data {
                    reason: format!("sector file has no '{}' column", name),
                })
        };
        let ticker_col = find("ticker")?;
        let sector_col = find("sector")?;

        let mut sectors = HashMap::new();
        for result in rdr.records() {
            let record = result?;
            let ticker = record.get(ticker_col).map(str::trim).unwrap_or_default();
            let sector = record.get(sector_col).map(str::trim).unwrap_or_default();
            if ticker.is_empty() || sector.is_empty() {
                continue;
            }
            sectors.insert(ticker.to_string(), sector.to_string());
        }

        info!("Loaded sectors for {} tickers from {}", sectors.len(), path.display());
        Ok(Self { sectors })
    }
}

impl SectorPort for CsvSectorAdapter {
    /// Tickers are matched on their first whitespace-separated token, so
    /// `"BRK.B US Equity"` resolves through `BRK.B`.
    fn lookup(&self, ticker: &str) -> String {
        let key = ticker.split_whitespace().next().unwrap_or_default();
        match self.sectors.get(key) {
            Some(sector) => sector.clone(),
            None => {
                debug!("No sector for {}", ticker);
                UNKNOWN_SECTOR.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn adapter(content: &str) -> CsvSectorAdapter {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sectors.csv");
        fs::write(&path, content).unwrap();
        CsvSectorAdapter::from_path(&path).unwrap()
    }

    #[test]
    fn lookup_known_and_unknown() {
        let sectors = adapter("ticker,sector\nKO,Consumer Staples\nXOM, Energy \nGAP,\n");
        assert_eq!(sectors.lookup("KO"), "Consumer Staples");
        assert_eq!(sectors.lookup("XOM"), "Energy");
        assert_eq!(sectors.lookup("GAP"), UNKNOWN_SECTOR);
        assert_eq!(sectors.lookup("ZZZ"), UNKNOWN_SECTOR);
    }

    #[test]
    fn lookup_uses_first_token() {
        let sectors = adapter("Sector,Ticker\nFinancials,BRK.B\n");
        assert_eq!(sectors.lookup("BRK.B US Equity"), "Financials");
        assert_eq!(sectors.lookup("   "), UNKNOWN_SECTOR);
    }

    #[test]
    fn empty_adapter_knows_nothing() {
        assert_eq!(CsvSectorAdapter::empty().lookup("KO"), UNKNOWN_SECTOR);
    }

    #[test]
    fn missing_column_is_data_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sectors.csv");
        fs::write(&path, "symbol,industry\nKO,Beverages\n").unwrap();
        let err = CsvSectorAdapter::from_path(&path).unwrap_err();
        assert!(matches!(err, ValueScreenError::Data { .. }));
    }
}
