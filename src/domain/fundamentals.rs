//! Fundamentals table and per-date candidate filtering.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// A ticker eligible for selection at one rebalance date.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub ticker: String,
    pub pe: f64,
}

impl Candidate {
    pub fn new(ticker: impl Into<String>, pe: f64) -> Self {
        Self {
            ticker: ticker.into(),
            pe,
        }
    }
}

/// Ticker -> date -> PE ratio.
///
/// Tickers iterate in sorted order, which fixes the tie-break order for
/// candidates that share a PE. A missing (ticker, date) pair means the PE is
/// unknown at that date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundamentalsTable {
    entries: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl FundamentalsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a PE observation. Non-finite or non-positive values are ignored.
    /// A later insert for the same pair replaces the earlier one.
    pub fn insert(&mut self, ticker: &str, date: NaiveDate, pe: f64) -> bool {
        if !pe.is_finite() || pe <= 0.0 {
            return false;
        }
        self.entries
            .entry(ticker.to_string())
            .or_default()
            .insert(date, pe);
        true
    }

    pub fn pe_at(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.entries.get(ticker)?.get(&date).copied()
    }

    pub fn ticker_count(&self) -> usize {
        self.entries.len()
    }

    pub fn observation_count(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Earliest and latest observation dates across all tickers.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self
            .entries
            .values()
            .filter_map(|dates| dates.keys().next())
            .min()?;
        let last = self
            .entries
            .values()
            .filter_map(|dates| dates.keys().next_back())
            .max()?;
        Some((*first, *last))
    }

    /// All tickers with a PE recorded exactly at `date` and PE <= `max_pe`,
    /// in ticker order. No nearest-date matching.
    pub fn candidates_at(&self, date: NaiveDate, max_pe: f64) -> Vec<Candidate> {
        self.entries
            .iter()
            .filter_map(|(ticker, dates)| {
                dates
                    .get(&date)
                    .filter(|&&pe| pe <= max_pe)
                    .map(|&pe| Candidate::new(ticker.clone(), pe))
            })
            .collect()
    }
}
