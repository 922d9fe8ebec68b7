//! Rebalancing backtest engine.
//!
//! Walks the rebalance schedule one holding period at a time. At each
//! rebalance date the engine either selects a new portfolio, carries the
//! previous one forward, or skips the period, then chains the NAV through the
//! period's price returns. Data gaps never abort a run; only configuration
//! errors do, and those are caught before the first period.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::error::ValueScreenError;
use crate::domain::fundamentals::FundamentalsTable;
use crate::domain::portfolio::{
    equal_weights, ConstituentRecord, HoldingState, NavPoint, Portfolio,
};
use crate::domain::schedule::{build_schedule, RebalanceFrequency, ScheduleError};
use crate::domain::sector::SectorCache;
use crate::domain::selection;
use crate::ports::price_port::PricePort;
use crate::ports::sector_port::SectorPort;

pub const DEFAULT_TOP_N: usize = 25;
pub const DEFAULT_MAX_PE: f64 = 20.0;
pub const DEFAULT_MAX_PER_SECTOR: usize = 5;
pub const DEFAULT_INITIAL_NAV: f64 = 100.0;
pub const DEFAULT_FREQUENCY: RebalanceFrequency = RebalanceFrequency::MonthEnds(6);

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rebalance_frequency: RebalanceFrequency,
    pub top_n: usize,
    pub max_pe: f64,
    pub max_per_sector: usize,
    pub initial_nav: f64,
}

impl BacktestConfig {
    /// Config with the default screen parameters over `[start_date, end_date]`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            rebalance_frequency: DEFAULT_FREQUENCY,
            top_n: DEFAULT_TOP_N,
            max_pe: DEFAULT_MAX_PE,
            max_per_sector: DEFAULT_MAX_PER_SECTOR,
            initial_nav: DEFAULT_INITIAL_NAV,
        }
    }

    /// Check every parameter and build the schedule.
    pub fn schedule(&self) -> Result<Vec<NaiveDate>, ValueScreenError> {
        if self.top_n == 0 {
            return Err(ValueScreenError::invalid(
                "backtest",
                "top_n",
                "top_n must be at least 1",
            ));
        }
        if self.max_per_sector == 0 {
            return Err(ValueScreenError::invalid(
                "backtest",
                "max_per_sector",
                "max_per_sector must be at least 1",
            ));
        }
        if !self.max_pe.is_finite() || self.max_pe <= 0.0 {
            return Err(ValueScreenError::invalid(
                "backtest",
                "max_pe",
                "max_pe must be a positive number",
            ));
        }
        if !self.initial_nav.is_finite() || self.initial_nav <= 0.0 {
            return Err(ValueScreenError::invalid(
                "backtest",
                "initial_nav",
                "initial_nav must be a positive number",
            ));
        }

        build_schedule(self.start_date, self.end_date, self.rebalance_frequency).map_err(|e| {
            let key = match e {
                ScheduleError::InvalidFrequency(_) | ScheduleError::TooShort { .. } => {
                    "rebalance_frequency"
                }
                ScheduleError::EmptyRange { .. } => "start_date",
            };
            ValueScreenError::invalid("backtest", key, e.to_string())
        })
    }
}

/// Why a holding period produced no NAV points and no records.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Too few candidates and nothing held yet.
    NoPortfolio,
    /// The price source returned nothing usable.
    NoPriceData,
    InsufficientPrices { observations: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeriodDecision {
    Rebalanced { selected: usize },
    CarriedForward,
    Skipped(SkipReason),
}

/// What happened over one `(date, next_date)` holding period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodOutcome {
    pub date: NaiveDate,
    pub next_date: NaiveDate,
    /// Tickers passing the PE screen at `date`.
    pub candidates: usize,
    /// Size of the selection in force after the decision (0 when unselected).
    pub holdings: usize,
    pub decision: PeriodDecision,
}

impl PeriodOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self.decision, PeriodDecision::Skipped(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub schedule: Vec<NaiveDate>,
    pub initial_nav: f64,
    pub nav: Vec<NavPoint>,
    pub constituents: Vec<ConstituentRecord>,
    pub periods: Vec<PeriodOutcome>,
}

impl BacktestResult {
    pub fn final_nav(&self) -> f64 {
        self.nav.last().map(|p| p.value).unwrap_or(self.initial_nav)
    }

    /// Records tagged with `date`, in selection order.
    pub fn holdings_at(&self, date: NaiveDate) -> Vec<&ConstituentRecord> {
        self.constituents.iter().filter(|r| r.date == date).collect()
    }

    /// Distinct rebalance dates that produced records, in order.
    pub fn recorded_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.constituents.iter().map(|r| r.date).collect();
        dates.dedup();
        dates
    }
}

/// Single-run rebalancing engine.
///
/// Owns its sector cache for the run; `run` consumes the engine so state never
/// leaks between runs.
pub struct RebalanceEngine<'a> {
    config: BacktestConfig,
    prices: &'a dyn PricePort,
    sectors: SectorCache<'a>,
}

impl<'a> RebalanceEngine<'a> {
    pub fn new(
        config: BacktestConfig,
        prices: &'a dyn PricePort,
        sectors: &'a dyn SectorPort,
    ) -> Self {
        Self {
            config,
            prices,
            sectors: SectorCache::new(sectors),
        }
    }

    pub fn run(mut self, fundamentals: &FundamentalsTable) -> Result<BacktestResult, ValueScreenError> {
        let schedule = self.config.schedule()?;
        info!(
            "Running backtest: {} rebalance dates from {} to {} ({})",
            schedule.len(),
            schedule[0],
            self.config.end_date,
            self.config.rebalance_frequency
        );

        let mut portfolio = Portfolio::new(schedule[0], self.config.initial_nav);
        let mut periods = Vec::with_capacity(schedule.len() - 1);

        for window in schedule.windows(2) {
            let outcome = self.step(fundamentals, &mut portfolio, window[0], window[1]);
            periods.push(outcome);
        }

        info!(
            "Backtest finished: {} NAV points, {} constituent records, final NAV {:.2}",
            portfolio.nav_series.len(),
            portfolio.constituents.len(),
            portfolio.nav
        );

        Ok(BacktestResult {
            schedule,
            initial_nav: portfolio.initial_nav,
            nav: portfolio.nav_series,
            constituents: portfolio.constituents,
            periods,
        })
    }

    fn step(
        &mut self,
        fundamentals: &FundamentalsTable,
        portfolio: &mut Portfolio,
        date: NaiveDate,
        next_date: NaiveDate,
    ) -> PeriodOutcome {
        let candidates = fundamentals.candidates_at(date, self.config.max_pe);
        let top_n = self.config.top_n;

        let mut outcome = PeriodOutcome {
            date,
            next_date,
            candidates: candidates.len(),
            holdings: 0,
            decision: PeriodDecision::CarriedForward,
        };

        if candidates.len() >= top_n {
            let selected = selection::select(
                &candidates,
                top_n,
                self.config.max_per_sector,
                &mut self.sectors,
            );
            if selected.len() < top_n {
                info!(
                    "{}: sector caps left {} of {} slots filled",
                    date,
                    selected.len(),
                    top_n
                );
            }
            info!(
                "{}: rebalancing into {} tickers from {} candidates",
                date,
                selected.len(),
                candidates.len()
            );
            outcome.decision = PeriodDecision::Rebalanced {
                selected: selected.len(),
            };
            portfolio.holding = HoldingState::Holding(selected);
        } else if portfolio.holding == HoldingState::Unselected {
            info!(
                "Skipping {}: {} candidates and no previous portfolio",
                date,
                candidates.len()
            );
            outcome.decision = PeriodDecision::Skipped(SkipReason::NoPortfolio);
            return outcome;
        } else {
            info!(
                "{}: carrying forward portfolio ({} candidates < {})",
                date,
                candidates.len(),
                top_n
            );
        }

        // `Unselected` returned above, and a rebalance with top_n and
        // max_per_sector of at least 1 always admits the cheapest candidate.
        let Some(tickers) = portfolio.holding.selection().map(<[String]>::to_vec) else {
            outcome.decision = PeriodDecision::Skipped(SkipReason::NoPortfolio);
            return outcome;
        };
        debug_assert!(!tickers.is_empty(), "rebalance produced an empty selection");
        outcome.holdings = tickers.len();
        let weights = equal_weights(tickers.len());

        let table = self.prices.fetch(&tickers, date, next_date);
        if table.is_empty() || table.tickers() != tickers.as_slice() {
            warn!("Skipping {} -> {}: no usable price data", date, next_date);
            outcome.decision = PeriodDecision::Skipped(SkipReason::NoPriceData);
            return outcome;
        }
        if table.len() < 2 {
            warn!(
                "Skipping {} -> {}: only {} price observation(s)",
                date,
                next_date,
                table.len()
            );
            outcome.decision = PeriodDecision::Skipped(SkipReason::InsufficientPrices {
                observations: table.len(),
            });
            return outcome;
        }

        let values = table.weighted_values(&weights, portfolio.nav);
        for &(point_date, value) in values.iter().skip(1) {
            if portfolio.last_nav_date().is_some_and(|last| point_date <= last) {
                continue;
            }
            portfolio.record_nav(point_date, value);
        }
        debug!(
            "{} -> {}: NAV {:.4} over {} observations",
            date,
            next_date,
            portfolio.nav,
            table.len()
        );

        for (ticker, weight) in tickers.iter().zip(&weights) {
            let sector = self.sectors.resolve(ticker).to_string();
            portfolio.record_constituent(ConstituentRecord {
                date,
                ticker: ticker.clone(),
                weight: *weight,
                sector,
            });
        }

        outcome
    }
}

/// Convenience wrapper: build an engine and run it once.
pub fn run_backtest(
    fundamentals: &FundamentalsTable,
    config: &BacktestConfig,
    prices: &dyn PricePort,
    sectors: &dyn SectorPort,
) -> Result<BacktestResult, ValueScreenError> {
    RebalanceEngine::new(config.clone(), prices, sectors).run(fundamentals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prices::PriceTable;
    use crate::domain::sector::UNKNOWN_SECTOR;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Every ticker grows linearly by `step` per day from 100.
    struct LinearPrices {
        step: f64,
    }

    impl PricePort for LinearPrices {
        fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> PriceTable {
            let series: HashMap<String, Vec<(NaiveDate, f64)>> = tickers
                .iter()
                .map(|t| {
                    let points = start
                        .iter_days()
                        .take_while(|day| *day <= end)
                        .map(|day| {
                            let offset = (day - start).num_days() as f64;
                            (day, 100.0 + self.step * offset)
                        })
                        .collect();
                    (t.clone(), points)
                })
                .collect();
            PriceTable::align(tickers, &series, start, end)
        }
    }

    struct NoSectors;

    impl SectorPort for NoSectors {
        fn lookup(&self, _ticker: &str) -> String {
            UNKNOWN_SECTOR.to_string()
        }
    }

    fn config(top_n: usize) -> BacktestConfig {
        BacktestConfig {
            rebalance_frequency: RebalanceFrequency::MonthEnds(1),
            top_n,
            max_per_sector: top_n,
            ..BacktestConfig::new(d(2023, 1, 31), d(2023, 3, 31))
        }
    }

    fn fundamentals(dates: &[NaiveDate], tickers: &[&str]) -> FundamentalsTable {
        let mut table = FundamentalsTable::new();
        for date in dates {
            for (i, t) in tickers.iter().enumerate() {
                table.insert(t, *date, 10.0 + i as f64);
            }
        }
        table
    }

    #[test]
    fn default_config_values() {
        let c = BacktestConfig::new(d(2020, 1, 1), d(2024, 12, 31));
        assert_eq!(c.top_n, 25);
        assert_eq!(c.max_pe, 20.0);
        assert_eq!(c.max_per_sector, 5);
        assert_eq!(c.initial_nav, 100.0);
        assert_eq!(c.rebalance_frequency, RebalanceFrequency::MonthEnds(6));
    }

    #[test]
    fn zero_top_n_rejected() {
        let err = config(0).schedule().unwrap_err();
        assert!(matches!(err, ValueScreenError::ConfigInvalid { key, .. } if key == "top_n"));
    }

    #[test]
    fn zero_max_per_sector_rejected() {
        let c = BacktestConfig {
            max_per_sector: 0,
            ..config(2)
        };
        let err = c.schedule().unwrap_err();
        assert!(
            matches!(err, ValueScreenError::ConfigInvalid { key, .. } if key == "max_per_sector")
        );
    }

    #[test]
    fn inverted_dates_rejected() {
        let c = BacktestConfig {
            start_date: d(2024, 1, 1),
            end_date: d(2023, 1, 1),
            ..config(2)
        };
        let err = c.schedule().unwrap_err();
        assert!(matches!(err, ValueScreenError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn no_fundamentals_yields_initial_point_only() {
        let prices = LinearPrices { step: 1.0 };
        let result =
            run_backtest(&FundamentalsTable::new(), &config(2), &prices, &NoSectors).unwrap();
        assert_eq!(result.nav, vec![NavPoint { date: d(2023, 1, 31), value: 100.0 }]);
        assert!(result.constituents.is_empty());
        assert!(result.periods.iter().all(PeriodOutcome::is_skipped));
    }

    #[test]
    fn nav_chains_across_periods() {
        let dates = [d(2023, 1, 31), d(2023, 2, 28)];
        let table = fundamentals(&dates, &["A", "B"]);
        let prices = LinearPrices { step: 1.0 };
        let result = run_backtest(&table, &config(2), &prices, &NoSectors).unwrap();

        // Period 1: 28 days at +1/day from 100 -> 128% of 100.
        let end_of_feb = result.nav.iter().find(|p| p.date == d(2023, 2, 28)).unwrap();
        assert_relative_eq!(end_of_feb.value, 128.0, epsilon = 1e-9);
        // Period 2: 31 days -> 131% of 128.
        assert_relative_eq!(result.final_nav(), 128.0 * 1.31, epsilon = 1e-9);
        assert_eq!(result.nav.last().unwrap().date, d(2023, 3, 31));
        // No duplicated boundary point.
        assert_eq!(result.nav.len(), 1 + 28 + 31);
    }

    #[test]
    fn carry_forward_when_candidates_dry_up() {
        let mut table = fundamentals(&[d(2023, 1, 31)], &["A", "B"]);
        table.insert("A", d(2023, 2, 28), 10.0);
        let prices = LinearPrices { step: 0.5 };
        let result = run_backtest(&table, &config(2), &prices, &NoSectors).unwrap();

        assert_eq!(
            result.periods[1].decision,
            PeriodDecision::CarriedForward
        );
        let held: Vec<_> = result
            .holdings_at(d(2023, 2, 28))
            .iter()
            .map(|r| r.ticker.as_str())
            .collect();
        assert_eq!(held, vec!["A", "B"]);
    }

    #[test]
    fn skipped_price_period_keeps_new_selection() {
        struct NothingInFebruary;
        impl PricePort for NothingInFebruary {
            fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> PriceTable {
                if start == NaiveDate::from_ymd_opt(2023, 1, 31).unwrap() {
                    return PriceTable::empty();
                }
                LinearPrices { step: 1.0 }.fetch(tickers, start, end)
            }
        }

        let table = fundamentals(&[d(2023, 1, 31)], &["A", "B"]);
        let result = run_backtest(&table, &config(2), &NothingInFebruary, &NoSectors).unwrap();

        assert_eq!(
            result.periods[0].decision,
            PeriodDecision::Skipped(SkipReason::NoPriceData)
        );
        assert_eq!(result.periods[0].holdings, 2);
        // The January selection is carried into March even though January was skipped.
        assert_eq!(result.periods[1].decision, PeriodDecision::CarriedForward);
        assert_eq!(result.recorded_dates(), vec![d(2023, 2, 28)]);
    }

    #[test]
    fn tightest_sector_cap_still_holds_cheapest_ticker() {
        let table = fundamentals(&[d(2023, 1, 31), d(2023, 2, 28)], &["A", "B", "C"]);
        let config = BacktestConfig {
            max_per_sector: 1,
            ..config(3)
        };
        let prices = LinearPrices { step: 1.0 };
        let result = run_backtest(&table, &config, &prices, &NoSectors).unwrap();

        for period in &result.periods {
            assert_eq!(period.decision, PeriodDecision::Rebalanced { selected: 1 });
            assert_eq!(period.holdings, 1);
        }
        let held: Vec<_> = result
            .holdings_at(d(2023, 1, 31))
            .iter()
            .map(|r| (r.ticker.as_str(), r.weight))
            .collect();
        assert_eq!(held, vec![("A", 1.0)]);
    }
}
