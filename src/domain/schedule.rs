//! Rebalance schedule generation.
//!
//! A frequency is written `<n><unit>`, e.g. `6ME`, `3M`, `2W`, `1YE`. Anchored
//! units (`ME`, `QE`, `YE`) land on period ends and start at the first anchor
//! on or after the start date. Unanchored units (`D`, `W`, `M`) start at the
//! start date itself. The schedule always ends exactly on the end date.
//!
//! `M` means calendar months from the start date, not month ends, and `W`
//! steps whole weeks from the start date without a weekday anchor. Configs
//! written against pandas offset aliases (where `M` is a month end and `W` is
//! `W-SUN`) should use `ME` for month ends.

use chrono::{Datelike, Days, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceFrequency {
    Days(u32),
    Weeks(u32),
    /// Calendar months counted from the start date, day clamped to month length.
    Months(u32),
    MonthEnds(u32),
    QuarterEnds(u32),
    YearEnds(u32),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid rebalance frequency '{0}' (expected e.g. 6ME, 3M, 2W, 30D, 1QE, 1YE)")]
    InvalidFrequency(String),

    #[error("start date {start} must be before end date {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("schedule has {len} date(s); at least 2 are needed for one holding period")]
    TooShort { len: usize },
}

impl FromStr for RebalanceFrequency {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim().to_uppercase();
        let split = spec
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ScheduleError::InvalidFrequency(s.to_string()))?;
        let (digits, unit) = spec.split_at(split);
        let n = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| ScheduleError::InvalidFrequency(s.to_string()))?
        };
        if n == 0 {
            return Err(ScheduleError::InvalidFrequency(s.to_string()));
        }
        match unit {
            "D" => Ok(RebalanceFrequency::Days(n)),
            "W" => Ok(RebalanceFrequency::Weeks(n)),
            "M" => Ok(RebalanceFrequency::Months(n)),
            "ME" => Ok(RebalanceFrequency::MonthEnds(n)),
            "Q" | "QE" => Ok(RebalanceFrequency::QuarterEnds(n)),
            "Y" | "YE" => Ok(RebalanceFrequency::YearEnds(n)),
            _ => Err(ScheduleError::InvalidFrequency(s.to_string())),
        }
    }
}

impl fmt::Display for RebalanceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceFrequency::Days(n) => write!(f, "{n}D"),
            RebalanceFrequency::Weeks(n) => write!(f, "{n}W"),
            RebalanceFrequency::Months(n) => write!(f, "{n}M"),
            RebalanceFrequency::MonthEnds(n) => write!(f, "{n}ME"),
            RebalanceFrequency::QuarterEnds(n) => write!(f, "{n}QE"),
            RebalanceFrequency::YearEnds(n) => write!(f, "{n}YE"),
        }
    }
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn month_end(first: NaiveDate) -> Option<NaiveDate> {
    first.checked_add_months(Months::new(1))?.pred_opt()
}

impl RebalanceFrequency {
    /// The `k`-th grid point for a grid anchored at `start`, or `None` once the
    /// offset no longer fits the calendar.
    fn nth(&self, start: NaiveDate, k: u32) -> Option<NaiveDate> {
        match *self {
            RebalanceFrequency::Days(n) => {
                start.checked_add_days(Days::new(u64::from(k.checked_mul(n)?)))
            }
            RebalanceFrequency::Weeks(n) => {
                start.checked_add_days(Days::new(u64::from(k.checked_mul(n)?) * 7))
            }
            RebalanceFrequency::Months(n) => {
                start.checked_add_months(Months::new(k.checked_mul(n)?))
            }
            RebalanceFrequency::MonthEnds(n) => {
                let base = first_of_month(start)?;
                month_end(base.checked_add_months(Months::new(k.checked_mul(n)?))?)
            }
            RebalanceFrequency::QuarterEnds(n) => {
                let quarter_end_month = (start.month() - 1) / 3 * 3 + 3;
                let base = NaiveDate::from_ymd_opt(start.year(), quarter_end_month, 1)?;
                let months = k.checked_mul(n)?.checked_mul(3)?;
                month_end(base.checked_add_months(Months::new(months))?)
            }
            RebalanceFrequency::YearEnds(n) => {
                let base = NaiveDate::from_ymd_opt(start.year(), 12, 1)?;
                let months = k.checked_mul(n)?.checked_mul(12)?;
                month_end(base.checked_add_months(Months::new(months))?)
            }
        }
    }
}

/// Build the rebalance schedule for `[start, end]`.
///
/// The result is strictly increasing, ends on `end`, and has at least two
/// dates.
pub fn build_schedule(
    start: NaiveDate,
    end: NaiveDate,
    frequency: RebalanceFrequency,
) -> Result<Vec<NaiveDate>, ScheduleError> {
    if start >= end {
        return Err(ScheduleError::EmptyRange { start, end });
    }

    let mut dates = Vec::new();
    for k in 0.. {
        match frequency.nth(start, k) {
            Some(date) if date <= end => dates.push(date),
            _ => break,
        }
    }

    if dates.last() != Some(&end) {
        dates.push(end);
    }

    if dates.len() < 2 {
        return Err(ScheduleError::TooShort { len: dates.len() });
    }
    Ok(dates)
}
