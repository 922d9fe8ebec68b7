//! Configuration validation.
//!
//! Checks every config field before any data is loaded, so a bad value fails
//! fast with the section and key that caused it.

use crate::domain::error::ValueScreenError;
use crate::domain::schedule::RebalanceFrequency;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ValueScreenError> {
    validate_dates(config)?;
    validate_frequency(config)?;
    validate_positive_int(config, "top_n")?;
    validate_positive_int(config, "max_per_sector")?;
    validate_positive_number(config, "max_pe")?;
    validate_positive_number(config, "initial_nav")?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), ValueScreenError> {
    for key in ["fundamentals", "prices_dir"] {
        required_string(config, "data", key)?;
    }
    Ok(())
}

pub fn validate_report_config(config: &dyn ConfigPort) -> Result<(), ValueScreenError> {
    match config.get_string("report", "format").as_deref().map(str::trim) {
        None | Some("typst") | Some("csv") => Ok(()),
        Some(other) => Err(ValueScreenError::invalid(
            "report",
            "format",
            format!("unknown report format '{}', expected typst or csv", other),
        )),
    }
}

pub fn required_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, ValueScreenError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ValueScreenError::missing(section, key)),
    }
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, ValueScreenError> {
    match value {
        None => Err(ValueScreenError::missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
            ValueScreenError::invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ValueScreenError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(ValueScreenError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_frequency(config: &dyn ConfigPort) -> Result<(), ValueScreenError> {
    if let Some(s) = config.get_string("backtest", "rebalance_frequency") {
        RebalanceFrequency::from_str(&s)
            .map_err(|e| ValueScreenError::invalid("backtest", "rebalance_frequency", e.to_string()))?;
    }
    Ok(())
}

/// Optional keys: absent is fine (a default applies), present must parse.
fn validate_positive_int(config: &dyn ConfigPort, key: &str) -> Result<(), ValueScreenError> {
    let Some(raw) = config.get_string("backtest", key) else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= 1 => Ok(()),
        _ => Err(ValueScreenError::invalid(
            "backtest",
            key,
            format!("{} must be an integer of at least 1", key),
        )),
    }
}

fn validate_positive_number(config: &dyn ConfigPort, key: &str) -> Result<(), ValueScreenError> {
    let Some(raw) = config.get_string("backtest", key) else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
        _ => Err(ValueScreenError::invalid(
            "backtest",
            key,
            format!("{} must be a positive number", key),
        )),
    }
}
