//! Performance summary for a finished backtest.

use super::backtest::{BacktestResult, PeriodDecision};
use super::portfolio::NavPoint;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_nav: f64,
    pub final_nav: f64,
    pub total_return: f64,
    /// Compounded over calendar days between the first and last NAV point.
    pub annualized_return: f64,
    pub max_drawdown: f64,
    /// Longest run of NAV observations spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub periods_rebalanced: usize,
    pub periods_carried_forward: usize,
    pub periods_skipped: usize,
}

impl Metrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let nav = &result.nav;
        let initial_nav = result.initial_nav;
        let final_nav = result.final_nav();

        let total_return = if initial_nav > 0.0 {
            (final_nav - initial_nav) / initial_nav
        } else {
            0.0
        };

        let days = match (nav.first(), nav.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days(),
            _ => 0,
        };
        let years = days as f64 / DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(nav);

        let mut periods_rebalanced = 0;
        let mut periods_carried_forward = 0;
        let mut periods_skipped = 0;
        for period in &result.periods {
            match period.decision {
                PeriodDecision::Rebalanced { .. } => periods_rebalanced += 1,
                PeriodDecision::CarriedForward => periods_carried_forward += 1,
                PeriodDecision::Skipped(_) => periods_skipped += 1,
            }
        }

        Metrics {
            initial_nav,
            final_nav,
            total_return,
            annualized_return,
            max_drawdown,
            max_drawdown_duration,
            periods_rebalanced,
            periods_carried_forward,
            periods_skipped,
        }
    }
}

fn compute_drawdown(nav: &[NavPoint]) -> (f64, usize) {
    let Some(first) = nav.first() else {
        return (0.0, 0);
    };

    let mut peak = first.value;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in nav {
        if point.value >= peak {
            peak = point.value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.value) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

/// Rebase a price series so its first value equals `base`.
pub fn rebase(series: &[(chrono::NaiveDate, f64)], base: f64) -> Vec<NavPoint> {
    let Some(&(_, first)) = series.first() else {
        return Vec::new();
    };
    if first <= 0.0 {
        return Vec::new();
    }
    series
        .iter()
        .map(|&(date, value)| NavPoint {
            date,
            value: value / first * base,
        })
        .collect()
}

/// Benchmark levels on the NAV's own dates.
///
/// The whole series is rebased to the NAV's first value at the benchmark's
/// first observation, then restricted to NAV dates. NAV dates the benchmark
/// lacks are simply missing from the output.
pub fn align_benchmark(series: &[(chrono::NaiveDate, f64)], nav: &[NavPoint]) -> Vec<NavPoint> {
    let Some(base) = nav.first().map(|p| p.value) else {
        return Vec::new();
    };
    let nav_dates: std::collections::HashSet<_> = nav.iter().map(|p| p.date).collect();
    rebase(series, base)
        .into_iter()
        .filter(|point| nav_dates.contains(&point.date))
        .collect()
}
