use crate::random::RandomSource;
use crate::series::{Series, SeriesFactory};

/// The type of a metric family.
///
/// Generated families are always gauges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// A value that can go up or down.
    Gauge,
}

impl MetricType {
    /// Gets the name of this type as used in the Prometheus text format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
        }
    }
}

/// A named group of series sharing a type.
#[derive(Clone, Debug, PartialEq)]
pub struct Family {
    name: String,
    metric_type: MetricType,
    pub(crate) series: Vec<Series>,
}

impl Family {
    /// Gets the name of this family.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the type of this family.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Gets the series of this family.
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Gets the number of series in this family.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether this family has no series at all.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Gets the inclusive range a family's series count is drawn from.
///
/// Counts land between half of `max_series` (rounded up) and `max_series`, so that families have
/// varying widths rather than all being exactly `max_series` wide.
pub fn series_count_bounds(max_series: usize) -> (usize, usize) {
    (max_series.div_ceil(2), max_series)
}

/// Generates `count` gauge families with random names.
///
/// For each family, the series count is drawn first, then the name, then the series themselves.
pub fn generate_families(
    count: usize,
    max_series: usize,
    factory: &SeriesFactory,
    rng: &mut RandomSource,
) -> Vec<Family> {
    let (lower, upper) = series_count_bounds(max_series);

    (0..count)
        .map(|_| {
            let series_count = lower + rng.below(upper - lower + 1);
            let name = rng.string();
            let series = factory.generate(series_count, rng);
            Family { name, metric_type: MetricType::Gauge, series }
        })
        .collect()
}
