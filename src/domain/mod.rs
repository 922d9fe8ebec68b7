//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod fundamentals;
pub mod metrics;
pub mod portfolio;
pub mod prices;
pub mod schedule;
pub mod sector;
pub mod selection;
