//! Sector classification port.

/// Maps a ticker to its sector label.
///
/// Implementations never fail outward: anything that goes wrong resolves to
/// [`UNKNOWN_SECTOR`](crate::domain::sector::UNKNOWN_SECTOR).
pub trait SectorPort {
    fn lookup(&self, ticker: &str) -> String;
}
