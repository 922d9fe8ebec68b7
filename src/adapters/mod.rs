//! Concrete port implementations.

pub mod csv_fundamentals_adapter;
pub mod csv_price_adapter;
pub mod csv_report_adapter;
pub mod csv_sector_adapter;
pub mod file_config_adapter;
pub mod typst_report;
