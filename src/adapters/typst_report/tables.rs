//! Typst table markup for reports.
//!
//! Provides functions to generate Typst markup for:
//! - Run parameters
//! - Headline metrics
//! - NAV at each rebalance date, against the benchmark when present
//! - Holdings per rebalance date
//! - Period decision log

use crate::domain::backtest::{BacktestConfig, BacktestResult, PeriodDecision, SkipReason};
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::NavPoint;
use chrono::NaiveDate;

fn format_pct(value: f64) -> String {
    format!("{:+.2}%", value * 100.0)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '#' | '*' | '_' | '$' | '@' | '<' | '>' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Last NAV level on or before `date`.
fn value_at(series: &[NavPoint], date: NaiveDate) -> Option<f64> {
    let idx = series.partition_point(|p| p.date <= date);
    idx.checked_sub(1).map(|i| series[i].value)
}

pub fn render_run_summary(config: &BacktestConfig, result: &BacktestResult) -> String {
    let mut out = String::from("#table(\n  columns: 2,\n  [*Parameter*], [*Value*],\n");
    let rows = [
        ("Period", format!("{} to {}", config.start_date, config.end_date)),
        ("Rebalance frequency", config.rebalance_frequency.to_string()),
        ("Rebalance dates", result.schedule.len().to_string()),
        ("Portfolio size", config.top_n.to_string()),
        ("Maximum PE", format!("{:.2}", config.max_pe)),
        ("Maximum per sector", config.max_per_sector.to_string()),
        ("Initial NAV", format!("{:.2}", config.initial_nav)),
    ];
    for (name, value) in rows {
        out.push_str(&format!("  [{}], [{}],\n", name, value));
    }
    out.push_str(")\n");
    out
}

pub fn render_metrics_table(metrics: &Metrics) -> String {
    let mut out = String::from("#table(\n  columns: 2,\n  [*Metric*], [*Value*],\n");
    let rows = [
        ("Final NAV", format!("{:.2}", metrics.final_nav)),
        ("Total Return", format_pct(metrics.total_return)),
        ("Annualized Return", format_pct(metrics.annualized_return)),
        ("Max Drawdown", format!("{:.2}%", metrics.max_drawdown * 100.0)),
        (
            "Max Drawdown Duration",
            format!("{} observations", metrics.max_drawdown_duration),
        ),
        ("Periods Rebalanced", metrics.periods_rebalanced.to_string()),
        (
            "Periods Carried Forward",
            metrics.periods_carried_forward.to_string(),
        ),
        ("Periods Skipped", metrics.periods_skipped.to_string()),
    ];
    for (name, value) in rows {
        out.push_str(&format!("  [{}], [{}],\n", name, value));
    }
    out.push_str(")\n");
    out
}

pub fn render_performance_table(
    result: &BacktestResult,
    benchmark: Option<(&str, &[NavPoint])>,
) -> String {
    if result.nav.is_empty() {
        return "_No NAV data._\n".to_string();
    }

    let mut out = String::new();
    match benchmark {
        Some((ticker, _)) => {
            out.push_str("#table(\n  columns: 4,\n  align: (left, right, right, right),\n");
            out.push_str(&format!(
                "  [*Date*], [*NAV*], [*Period Return*], [*{}*],\n",
                escape(ticker)
            ));
        }
        None => {
            out.push_str("#table(\n  columns: 3,\n  align: (left, right, right),\n");
            out.push_str("  [*Date*], [*NAV*], [*Period Return*],\n");
        }
    }

    let mut prev: Option<f64> = None;
    for &date in &result.schedule {
        let Some(nav) = value_at(&result.nav, date) else {
            continue;
        };
        let ret = match prev {
            Some(p) if p > 0.0 => format_pct(nav / p - 1.0),
            _ => "-".to_string(),
        };
        out.push_str(&format!("  [{}], [{:.2}], [{}],", date, nav, ret));
        if let Some((_, series)) = benchmark {
            let cell = value_at(series, date)
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(" [{}],", cell));
        }
        out.push('\n');
        prev = Some(nav);
    }

    out.push_str(")\n");
    out
}

pub fn render_constituents_table(result: &BacktestResult) -> String {
    if result.constituents.is_empty() {
        return "_No holdings were recorded._\n".to_string();
    }

    let mut out = String::new();
    for date in result.recorded_dates() {
        let holdings = result.holdings_at(date);
        out.push_str(&format!("=== {} ({} holdings)\n\n", date, holdings.len()));
        out.push_str("#table(\n  columns: 3,\n  align: (left, left, right),\n");
        out.push_str("  [*Ticker*], [*Sector*], [*Weight*],\n");
        for record in holdings {
            out.push_str(&format!(
                "  [{}], [{}], [{:.2}%],\n",
                escape(&record.ticker),
                escape(&record.sector),
                record.weight * 100.0
            ));
        }
        out.push_str(")\n\n");
    }
    out
}

fn describe(decision: &PeriodDecision) -> String {
    match decision {
        PeriodDecision::Rebalanced { selected } => format!("Rebalanced ({} selected)", selected),
        PeriodDecision::CarriedForward => "Carried forward".to_string(),
        PeriodDecision::Skipped(SkipReason::NoPortfolio) => "Skipped: no portfolio".to_string(),
        PeriodDecision::Skipped(SkipReason::NoPriceData) => "Skipped: no price data".to_string(),
        PeriodDecision::Skipped(SkipReason::InsufficientPrices { observations }) => {
            format!("Skipped: {} price observation(s)", observations)
        }
    }
}

pub fn render_period_log(result: &BacktestResult) -> String {
    if result.periods.is_empty() {
        return "_No holding periods._\n".to_string();
    }

    let mut out = String::from(
        "#table(\n  columns: 5,\n  align: (left, left, right, right, left),\n  [*From*], [*To*], [*Candidates*], [*Holdings*], [*Decision*],\n",
    );
    for period in &result.periods {
        let decision = describe(&period.decision);
        let cell = if period.is_skipped() {
            format!("text(fill: red, [{}])", decision)
        } else {
            format!("[{}]", decision)
        };
        out.push_str(&format!(
            "  [{}], [{}], [{}], [{}], {},\n",
            period.date, period.next_date, period.candidates, period.holdings, cell
        ));
    }
    out.push_str(")\n");
    out
}
