#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use valuescreen::domain::backtest::BacktestConfig;
use valuescreen::domain::fundamentals::FundamentalsTable;
use valuescreen::domain::prices::PriceTable;
use valuescreen::domain::schedule::RebalanceFrequency;
use valuescreen::domain::sector::UNKNOWN_SECTOR;
use valuescreen::ports::price_port::PricePort;
use valuescreen::ports::sector_port::SectorPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Prices growing geometrically from 100 at a per-ticker daily rate, with one
/// observation per calendar day.
pub struct MockPricePort {
    pub daily_rates: HashMap<String, f64>,
    pub default_rate: Option<f64>,
    /// Periods (by start date) for which the port reports nothing.
    pub gaps: HashSet<NaiveDate>,
    /// Tickers with no price history at all.
    pub missing: HashSet<String>,
    pub calls: RefCell<Vec<(Vec<String>, NaiveDate, NaiveDate)>>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            daily_rates: HashMap::new(),
            default_rate: Some(0.0005),
            gaps: HashSet::new(),
            missing: HashSet::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_rate(mut self, ticker: &str, rate: f64) -> Self {
        self.daily_rates.insert(ticker.to_string(), rate);
        self
    }

    pub fn with_default_rate(mut self, rate: f64) -> Self {
        self.default_rate = Some(rate);
        self
    }

    pub fn with_gap(mut self, period_start: NaiveDate) -> Self {
        self.gaps.insert(period_start);
        self
    }

    pub fn with_missing(mut self, ticker: &str) -> Self {
        self.missing.insert(ticker.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn series(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Option<Vec<(NaiveDate, f64)>> {
        if self.missing.contains(ticker) {
            return None;
        }
        let rate = self.daily_rates.get(ticker).copied().or(self.default_rate)?;
        // Anchored at a fixed epoch so consecutive periods agree on shared dates.
        let epoch = date(2000, 1, 1);
        Some(
            start
                .iter_days()
                .take_while(|d| *d <= end)
                .map(|d| {
                    let days = (d - epoch).num_days() as f64;
                    (d, 100.0 * (1.0 + rate).powf(days / 100.0))
                })
                .collect(),
        )
    }
}

impl PricePort for MockPricePort {
    fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> PriceTable {
        self.calls.borrow_mut().push((tickers.to_vec(), start, end));
        if self.gaps.contains(&start) {
            return PriceTable::empty();
        }
        let mut series = HashMap::new();
        for ticker in tickers {
            match self.series(ticker, start, end) {
                Some(s) => {
                    series.insert(ticker.clone(), s);
                }
                None => return PriceTable::empty(),
            }
        }
        PriceTable::align(tickers, &series, start, end)
    }
}

/// Fixed ticker-to-sector map that counts lookups per ticker.
pub struct MockSectorPort {
    pub sectors: HashMap<String, String>,
    pub lookups: RefCell<HashMap<String, usize>>,
}

impl MockSectorPort {
    pub fn new() -> Self {
        Self {
            sectors: HashMap::new(),
            lookups: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_sector(mut self, ticker: &str, sector: &str) -> Self {
        self.sectors.insert(ticker.to_string(), sector.to_string());
        self
    }

    pub fn lookups_for(&self, ticker: &str) -> usize {
        self.lookups.borrow().get(ticker).copied().unwrap_or(0)
    }

    pub fn total_lookups(&self) -> usize {
        self.lookups.borrow().values().sum()
    }
}

impl SectorPort for MockSectorPort {
    fn lookup(&self, ticker: &str) -> String {
        *self.lookups.borrow_mut().entry(ticker.to_string()).or_insert(0) += 1;
        self.sectors
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_SECTOR.to_string())
    }
}

pub const SECTORS: [&str; 6] = [
    "Energy",
    "Financials",
    "Health Care",
    "Industrials",
    "Technology",
    "Utilities",
];

/// `T00`..`T29`, five per sector in [`SECTORS`] order.
pub fn universe() -> Vec<String> {
    (0..30).map(|i| format!("T{:02}", i)).collect()
}

pub fn universe_sectors() -> MockSectorPort {
    universe()
        .iter()
        .enumerate()
        .fold(MockSectorPort::new(), |port, (i, ticker)| {
            port.with_sector(ticker, SECTORS[i / 5])
        })
}

/// PE for every universe ticker on every date; ticker `i` gets `5 + i * 0.5`.
pub fn universe_fundamentals(dates: &[NaiveDate]) -> FundamentalsTable {
    let mut table = FundamentalsTable::new();
    for d in dates {
        for (i, ticker) in universe().iter().enumerate() {
            table.insert(ticker, *d, 5.0 + i as f64 * 0.5);
        }
    }
    table
}

pub fn monthly_config(start: NaiveDate, end: NaiveDate, top_n: usize, max_per_sector: usize) -> BacktestConfig {
    BacktestConfig {
        rebalance_frequency: RebalanceFrequency::MonthEnds(1),
        top_n,
        max_per_sector,
        ..BacktestConfig::new(start, end)
    }
}
