//! Fundamentals source port.

use crate::domain::error::ValueScreenError;
use crate::domain::fundamentals::FundamentalsTable;
use std::path::Path;

pub trait FundamentalsPort {
    /// Load the PE table. Rows without a PE value are dropped.
    fn load(&self, path: &Path) -> Result<FundamentalsTable, ValueScreenError>;
}
