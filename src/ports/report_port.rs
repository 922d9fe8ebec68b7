//! Report generation port.

use crate::domain::backtest::{BacktestConfig, BacktestResult};
use crate::domain::error::ValueScreenError;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::NavPoint;
use std::path::Path;

/// Everything a report needs beyond the raw engine output.
pub struct ReportInput<'a> {
    pub config: &'a BacktestConfig,
    pub result: &'a BacktestResult,
    pub metrics: &'a Metrics,
    /// Benchmark ticker and its levels rebased to the NAV's initial value.
    pub benchmark: Option<(&'a str, &'a [NavPoint])>,
}

/// Port for writing backtest results.
pub trait ReportPort {
    fn export(&self, input: &ReportInput<'_>, destination: &Path) -> Result<(), ValueScreenError>;
}
