//! Date-aligned price table for one holding period.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    /// One price per ticker, in the table's ticker order.
    pub prices: Vec<f64>,
}

/// Price observations keyed by date with one column per ticker.
///
/// Every row carries a finite, positive price for every ticker. An empty table
/// means the period has no usable data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    tickers: Vec<String>,
    rows: Vec<PriceRow>,
}

impl PriceTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Inner-join per-ticker series on date within `[start, end]`.
    ///
    /// Dates missing for any ticker, and rows holding a non-finite or
    /// non-positive price, are dropped. A ticker with no series at all makes
    /// the whole table empty.
    pub fn align(
        tickers: &[String],
        series: &HashMap<String, Vec<(NaiveDate, f64)>>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        if tickers.is_empty() {
            return Self::empty();
        }

        let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        for (col, ticker) in tickers.iter().enumerate() {
            let Some(observations) = series.get(ticker) else {
                return Self::empty();
            };
            for &(date, price) in observations {
                if date < start || date > end {
                    continue;
                }
                by_date
                    .entry(date)
                    .or_insert_with(|| vec![None; tickers.len()])[col] = Some(price);
            }
        }

        let rows = by_date
            .into_iter()
            .filter_map(|(date, prices)| {
                let prices: Option<Vec<f64>> = prices
                    .into_iter()
                    .map(|p| p.filter(|v| v.is_finite() && *v > 0.0))
                    .collect();
                prices.map(|prices| PriceRow { date, prices })
            })
            .collect();

        Self {
            tickers: tickers.to_vec(),
            rows,
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Close series for a single ticker, used for benchmark overlays.
    pub fn column(&self, ticker: &str) -> Option<Vec<(NaiveDate, f64)>> {
        let col = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.rows.iter().map(|r| (r.date, r.prices[col])).collect())
    }

    /// Portfolio value at each row: each ticker's price relative to its first
    /// row, weighted and summed, scaled by `base`.
    ///
    /// `weights` is indexed like the ticker columns. The first value equals
    /// `base` times the weight sum.
    pub fn weighted_values(&self, weights: &[f64], base: f64) -> Vec<(NaiveDate, f64)> {
        let Some(first) = self.rows.first() else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| {
                let growth: f64 = row
                    .prices
                    .iter()
                    .zip(&first.prices)
                    .zip(weights)
                    .map(|((price, start), weight)| price / start * weight)
                    .sum();
                (row.date, growth * base)
            })
            .collect()
    }
}
