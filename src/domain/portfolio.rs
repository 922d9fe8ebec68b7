//! Portfolio state, NAV series and constituent records.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One holding in one rebalance period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstituentRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub weight: f64,
    pub sector: String,
}

/// Whether the engine has ever held a portfolio.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HoldingState {
    #[default]
    Unselected,
    Holding(Vec<String>),
}

impl HoldingState {
    pub fn selection(&self) -> Option<&[String]> {
        match self {
            HoldingState::Unselected => None,
            HoldingState::Holding(tickers) => Some(tickers),
        }
    }
}

/// Mutable state carried from one period to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub initial_nav: f64,
    pub nav: f64,
    pub holding: HoldingState,
    pub nav_series: Vec<NavPoint>,
    pub constituents: Vec<ConstituentRecord>,
}

impl Portfolio {
    /// Start a portfolio at `initial_nav` on `inception`.
    pub fn new(inception: NaiveDate, initial_nav: f64) -> Self {
        Portfolio {
            initial_nav,
            nav: initial_nav,
            holding: HoldingState::Unselected,
            nav_series: vec![NavPoint {
                date: inception,
                value: initial_nav,
            }],
            constituents: Vec::new(),
        }
    }

    pub fn record_nav(&mut self, date: NaiveDate, value: f64) {
        self.nav_series.push(NavPoint { date, value });
        self.nav = value;
    }

    pub fn record_constituent(&mut self, record: ConstituentRecord) {
        self.constituents.push(record);
    }

    pub fn last_nav_date(&self) -> Option<NaiveDate> {
        self.nav_series.last().map(|p| p.date)
    }
}

/// `1/n` for each of `n` holdings.
pub fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}
