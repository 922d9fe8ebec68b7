//! Memoized sector classification.

use crate::ports::sector_port::SectorPort;
use std::collections::HashMap;

/// Label used when a ticker cannot be classified.
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Run-scoped cache in front of a [`SectorPort`].
///
/// Sectors are treated as fixed for the duration of a run: each ticker is
/// looked up at most once and the answer is reused for both selection and
/// recording.
pub struct SectorCache<'a> {
    port: &'a dyn SectorPort,
    sectors: HashMap<String, String>,
}

impl<'a> SectorCache<'a> {
    pub fn new(port: &'a dyn SectorPort) -> Self {
        Self {
            port,
            sectors: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, ticker: &str) -> &str {
        let port = self.port;
        self.sectors
            .entry(ticker.to_string())
            .or_insert_with(|| {
                let sector = port.lookup(ticker);
                if sector.trim().is_empty() {
                    UNKNOWN_SECTOR.to_string()
                } else {
                    sector
                }
            })
            .as_str()
    }

    pub fn cached_count(&self) -> usize {
        self.sectors.len()
    }
}
