use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use quanta::Instant;
use tracing::info;

use crate::exposition::ExpositionFormat;
use crate::family::{generate_families, Family};
use crate::random::RandomSource;
use crate::series::SeriesFactory;

/// Every generated family, in generation order.
///
/// The number of families, and the number of series in each family, are fixed when the population
/// is generated.
#[derive(Clone, Debug, PartialEq)]
pub struct Population {
    families: Vec<Family>,
}

impl Population {
    /// Generates a new population of `families` families of up to `max_series` series each.
    pub fn generate(
        families: usize,
        max_series: usize,
        factory: &SeriesFactory,
        rng: &mut RandomSource,
    ) -> Self {
        Self { families: generate_families(families, max_series, factory, rng) }
    }

    /// Gets the families of this population.
    pub fn families(&self) -> &[Family] {
        &self.families
    }

    /// Gets the total number of series across all families.
    pub fn series_count(&self) -> usize {
        self.families.iter().map(Family::len).sum()
    }

    pub(crate) fn families_mut(&mut self) -> &mut [Family] {
        &mut self.families
    }
}

/// The state shared between scrapes and turnover cycles.
///
/// Only reachable through [`PopulationStore::lock`], which makes the store's lock the one region
/// in which the population, and the random source driving it, may be touched.
#[derive(Debug)]
pub struct PopulationState {
    pub(crate) population: Population,
    pub(crate) factory: SeriesFactory,
    pub(crate) rng: RandomSource,
}

impl PopulationState {
    /// Creates a new `PopulationState`.
    pub fn new(population: Population, factory: SeriesFactory, rng: RandomSource) -> Self {
        Self { population, factory, rng }
    }

    /// Gets the population without touching any values.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Redraws the value of every series and returns the population.
    ///
    /// Values come from the standard normal distribution, one draw per series, visiting families
    /// and their series in order.
    pub fn snapshot(&mut self) -> &Population {
        let start = Instant::now();

        let rng = &mut self.rng;
        for family in self.population.families_mut() {
            for series in &mut family.series {
                series.value = rng.standard_normal();
            }
        }

        let elapsed = Instant::now() - start;
        info!(series = self.population.series_count(), ?elapsed, "generated new metric values");

        &self.population
    }
}

/// A shared handle to a population.
///
/// Cloning the store is cheap, and every clone refers to the same population.
#[derive(Clone, Debug)]
pub struct PopulationStore {
    inner: Arc<Mutex<PopulationState>>,
}

impl PopulationStore {
    /// Creates a new `PopulationStore` from the given state.
    pub fn new(state: PopulationState) -> Self {
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    /// Locks the population.
    ///
    /// Snapshots and turnover cycles both require the guard, so they never interleave.
    pub fn lock(&self) -> MutexGuard<'_, PopulationState> {
        self.inner.lock()
    }

    /// Takes a snapshot and renders it in the given format.
    ///
    /// The lock is held until rendering finishes, so the payload always reflects exactly one
    /// state of the population.
    pub fn render(&self, format: ExpositionFormat) -> Vec<u8> {
        let mut state = self.lock();
        format.render(state.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::{Population, PopulationState, PopulationStore};
    use crate::exposition::ExpositionFormat;
    use crate::random::RandomSource;
    use crate::series::SeriesFactory;

    fn store(seed: u64) -> PopulationStore {
        let factory = SeriesFactory::default();
        let mut rng = RandomSource::from_seed(seed);
        let population = Population::generate(4, 10, &factory, &mut rng);
        PopulationStore::new(PopulationState::new(population, factory, rng))
    }

    #[test]
    fn test_snapshot_redraws_every_value() {
        let store = store(8);
        let mut state = store.lock();

        let first = state.snapshot().clone();
        let second = state.snapshot().clone();

        assert_eq!(first.families().len(), second.families().len());
        for (a, b) in first.families().iter().zip(second.families()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.len(), b.len());
            for (x, y) in a.series().iter().zip(b.series()) {
                assert_eq!(x.labels(), y.labels());
                assert_ne!(x.value(), y.value());
            }
        }
    }

    #[test]
    fn test_snapshot_is_reproducible() {
        let a = store(21);
        let b = store(21);

        for _ in 0..3 {
            assert_eq!(a.lock().snapshot(), b.lock().snapshot());
        }
    }

    #[test]
    fn test_series_count() {
        let store = store(2);
        let state = store.lock();
        let population = state.population();

        let expected: usize = population.families().iter().map(|f| f.len()).sum();
        assert_eq!(population.series_count(), expected);
    }

    #[test]
    fn test_clones_share_population() {
        let a = store(30);
        let b = a.clone();

        let from_a = a.lock().snapshot().clone();
        assert_eq!(&from_a, b.lock().population());
    }

    #[test]
    fn test_render_takes_snapshot() {
        let store = store(4);
        let before = store.lock().population().clone();
        assert!(before.families().iter().flat_map(|f| f.series()).all(|s| s.value() == 0.0));

        let rendered = store.render(ExpositionFormat::Text);
        assert!(!rendered.is_empty());

        let after = store.lock().population().clone();
        assert!(after.families().iter().flat_map(|f| f.series()).any(|s| s.value() != 0.0));
    }
}
