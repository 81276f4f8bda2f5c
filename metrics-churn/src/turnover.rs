//! Periodic replacement of series, simulating cardinality churn.
use std::num::NonZeroU32;
use std::time::Duration;

use quanta::Instant;
use tokio::task::JoinHandle;
use tracing::info;

use crate::population::{PopulationState, PopulationStore};
use crate::random::RandomSource;

/// Default turnover denominator.
pub const DEFAULT_TURNOVER_RATE: u32 = 6;

/// Default time between turnover cycles.
pub const DEFAULT_TURNOVER_INTERVAL: Duration = Duration::from_secs(15);

/// How much of each family is replaced per turnover cycle.
///
/// The rate is the denominator of a fraction: with a rate of `d`, each cycle replaces between
/// roughly `1/d` and `(d-1)/d` of every family. A rate of zero disables turnover entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnoverRate(u32);

impl TurnoverRate {
    /// A rate that never replaces anything.
    pub const DISABLED: TurnoverRate = TurnoverRate(0);

    /// Creates a new `TurnoverRate` with the given denominator.
    pub const fn new(denominator: u32) -> Self {
        Self(denominator)
    }

    /// Gets the denominator of this rate.
    pub fn denominator(&self) -> u32 {
        self.0
    }

    /// Gets the policy for this rate, or `None` if turnover is disabled.
    pub fn policy(&self) -> Option<TurnoverPolicy> {
        NonZeroU32::new(self.0).map(|denominator| TurnoverPolicy { denominator })
    }
}

impl Default for TurnoverRate {
    fn default() -> Self {
        TurnoverRate(DEFAULT_TURNOVER_RATE)
    }
}

/// Decides how many series to replace in a family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnoverPolicy {
    denominator: NonZeroU32,
}

impl TurnoverPolicy {
    /// Gets the inclusive range a replacement count is drawn from for a family of `len` series.
    ///
    /// Returns `None` when the family is too small for the denominator to leave a non-empty range,
    /// in which case the whole family is replaced.
    pub fn replacement_bounds(&self, len: usize) -> Option<(usize, usize)> {
        let (min_portion, most_of_series) = self.portions(len);
        if most_of_series > 0 {
            Some((min_portion, min_portion + most_of_series - 1))
        } else {
            None
        }
    }

    /// Draws the number of series to replace in a family of `len` series.
    pub fn replacement_count(&self, len: usize, rng: &mut RandomSource) -> usize {
        let (min_portion, most_of_series) = self.portions(len);
        if most_of_series > 0 {
            min_portion + rng.below(most_of_series)
        } else {
            len
        }
    }

    fn portions(&self, len: usize) -> (usize, usize) {
        let d = u128::from(self.denominator.get());
        let len = len as u128;

        let min_portion = len / d;
        let most_of_series = (d - 1) * len / d;
        (min_portion as usize, most_of_series as usize)
    }
}

/// The outcome of one turnover cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TurnoverReport {
    /// Number of families visited.
    pub families: usize,
    /// Number of series replaced across all families.
    pub replaced: usize,
}

impl PopulationState {
    /// Replaces a share of the series in every family with freshly generated ones.
    ///
    /// For each family in order, the replacement count is drawn first and then that many series are
    /// generated. New series overwrite the leading positions of the family; series past the
    /// replacement count are left alone, and family lengths never change.
    pub fn turnover_cycle(&mut self, policy: &TurnoverPolicy) -> TurnoverReport {
        let mut report = TurnoverReport::default();

        let factory = self.factory;
        let rng = &mut self.rng;
        for family in self.population.families_mut() {
            let count = policy.replacement_count(family.series.len(), rng);
            let fresh = factory.generate(count, rng);
            for (slot, series) in family.series.iter_mut().zip(fresh) {
                *slot = series;
            }

            report.families += 1;
            report.replaced += count;
        }

        report
    }
}

/// Runs turnover cycles against a population on a fixed interval.
#[derive(Debug)]
pub struct TurnoverScheduler {
    store: PopulationStore,
    policy: TurnoverPolicy,
    interval: Duration,
}

impl TurnoverScheduler {
    /// Creates a new `TurnoverScheduler`.
    ///
    /// Returns `None` if `rate` disables turnover, as there is nothing to schedule.
    pub fn new(store: PopulationStore, rate: TurnoverRate, interval: Duration) -> Option<Self> {
        let policy = rate.policy()?;
        Some(Self { store, policy, interval })
    }

    /// Runs a single turnover cycle immediately.
    pub fn cycle(&self) -> TurnoverReport {
        let start = Instant::now();
        let report = self.store.lock().turnover_cycle(&self.policy);
        let elapsed = Instant::now() - start;

        info!(
            families = report.families,
            replaced = report.replaced,
            ?elapsed,
            "replaced some old series with new ones"
        );

        report
    }

    /// Sleeps for the interval and runs a cycle, forever.
    pub async fn run(self) {
        loop {
            tokio::time::sleep(self.interval).await;
            self.cycle();
        }
    }

    /// Spawns [`run`][Self::run] onto the current Tokio runtime.
    ///
    /// ## Panics
    ///
    /// This method must be called from within an existing Tokio runtime or it will panic.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
