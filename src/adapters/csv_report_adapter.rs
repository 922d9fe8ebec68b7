//! CSV export of backtest results.
//!
//! Writes two files into the destination directory: `performance.csv` with
//! the daily NAV (and benchmark when configured) and `constituents.csv` with
//! one row per holding per rebalance date.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::domain::error::ValueScreenError;
use crate::ports::report_port::{ReportInput, ReportPort};

pub const PERFORMANCE_FILE: &str = "performance.csv";
pub const CONSTITUENTS_FILE: &str = "constituents.csv";

#[derive(Serialize)]
struct PerformanceRow {
    date: NaiveDate,
    nav: f64,
}

#[derive(Serialize)]
struct BenchmarkRow {
    date: NaiveDate,
    nav: f64,
    benchmark: Option<f64>,
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for CsvReportAdapter {
    fn export(&self, input: &ReportInput<'_>, destination: &Path) -> Result<(), ValueScreenError> {
        fs::create_dir_all(destination)?;

        let performance_path = destination.join(PERFORMANCE_FILE);
        let mut wtr = csv::Writer::from_path(&performance_path)?;
        match input.benchmark {
            Some((_, series)) => {
                let by_date: HashMap<NaiveDate, f64> =
                    series.iter().map(|p| (p.date, p.value)).collect();
                for point in &input.result.nav {
                    wtr.serialize(BenchmarkRow {
                        date: point.date,
                        nav: point.value,
                        benchmark: by_date.get(&point.date).copied(),
                    })?;
                }
            }
            None => {
                for point in &input.result.nav {
                    wtr.serialize(PerformanceRow {
                        date: point.date,
                        nav: point.value,
                    })?;
                }
            }
        }
        wtr.flush()?;

        let constituents_path = destination.join(CONSTITUENTS_FILE);
        let mut wtr = csv::Writer::from_path(&constituents_path)?;
        if input.result.constituents.is_empty() {
            wtr.write_record(["date", "ticker", "weight", "sector"])?;
        }
        for record in &input.result.constituents {
            wtr.serialize(record)?;
        }
        wtr.flush()?;

        info!(
            "Wrote {} NAV rows and {} constituent rows to {}",
            input.result.nav.len(),
            input.result.constituents.len(),
            destination.display()
        );
        Ok(())
    }
}
