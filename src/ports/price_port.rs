//! Historical price port.

use crate::domain::prices::PriceTable;
use chrono::NaiveDate;

pub trait PricePort {
    /// Prices for every ticker over `[start, end]`, one column per ticker in
    /// the order given. Any failure, including a single missing ticker, is
    /// reported as an empty table.
    fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> PriceTable;
}
