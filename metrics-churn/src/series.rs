use crate::random::RandomSource;

/// Key of the label every generated series carries.
pub const FIXED_LABEL_KEY: &str = "fixed_label";

/// Default number of distinct values the fixed label takes.
pub const DEFAULT_FIXED_LABEL_VALUES: u8 = 2;

/// Most fixed label values supported, one per letter of the alphabet.
pub const MAX_FIXED_LABEL_VALUES: u8 = 26;

/// Most random labels attached to a single series, not counting the fixed label.
pub const MAX_RANDOM_LABELS: usize = 9;

/// A key/value pair attached to a series.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label {
    key: String,
    value: String,
}

impl Label {
    /// Creates a new `Label`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Gets the key of this label.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the value of this label.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A single labelled gauge.
///
/// The labels of a series never change once it is generated. Only the value moves, and only when
/// a snapshot is taken.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    labels: Vec<Label>,
    pub(crate) value: f64,
}

impl Series {
    /// Gets the labels of this series, with the fixed label last.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Gets the value most recently assigned to this series.
    ///
    /// Series that have not been through a snapshot yet read as `0.0`.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Gets the value of the fixed label.
    pub fn fixed_label_value(&self) -> Option<&str> {
        self.labels.iter().rev().find(|label| label.key == FIXED_LABEL_KEY).map(Label::value)
    }
}

/// Generates series with random labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeriesFactory {
    fixed_label_values: u8,
}

impl SeriesFactory {
    /// Creates a new `SeriesFactory` whose fixed label takes one of the first `fixed_label_values`
    /// letters of the alphabet.
    ///
    /// The count is clamped to `1..=26`.
    pub fn new(fixed_label_values: u8) -> Self {
        Self { fixed_label_values: fixed_label_values.clamp(1, MAX_FIXED_LABEL_VALUES) }
    }

    /// Gets the number of distinct fixed label values.
    pub fn fixed_label_values(&self) -> u8 {
        self.fixed_label_values
    }

    /// Generates exactly `count` fresh series.
    ///
    /// For each series, the label count is drawn first, then every key/value pair in order, then
    /// the fixed label value.
    pub fn generate(&self, count: usize, rng: &mut RandomSource) -> Vec<Series> {
        (0..count).map(|_| self.generate_one(rng)).collect()
    }

    fn generate_one(&self, rng: &mut RandomSource) -> Series {
        let random_labels = rng.below(MAX_RANDOM_LABELS) + 1;

        let mut labels = Vec::with_capacity(random_labels + 1);
        for _ in 0..random_labels {
            let key = rng.string();
            let value = rng.string();
            labels.push(Label { key, value });
        }

        let fixed_value = rng.letter(usize::from(self.fixed_label_values));
        labels.push(Label::new(FIXED_LABEL_KEY, fixed_value));

        Series { labels, value: 0.0 }
    }
}

impl Default for SeriesFactory {
    fn default() -> Self {
        SeriesFactory::new(DEFAULT_FIXED_LABEL_VALUES)
    }
}

#[cfg(test)]
mod tests {
    use super::{SeriesFactory, FIXED_LABEL_KEY, MAX_RANDOM_LABELS};
    use crate::random::RandomSource;
    use proptest::prelude::*;

    #[test]
    fn test_generate_exact_count() {
        let factory = SeriesFactory::default();
        let mut rng = RandomSource::from_seed(3);

        assert!(factory.generate(0, &mut rng).is_empty());
        assert_eq!(factory.generate(1, &mut rng).len(), 1);
        assert_eq!(factory.generate(250, &mut rng).len(), 250);
    }

    #[test]
    fn test_fresh_series_read_as_zero() {
        let factory = SeriesFactory::default();
        let mut rng = RandomSource::from_seed(11);

        assert!(factory.generate(20, &mut rng).iter().all(|s| s.value() == 0.0));
    }

    #[test]
    fn test_fixed_label_values_clamped() {
        assert_eq!(SeriesFactory::new(0).fixed_label_values(), 1);
        assert_eq!(SeriesFactory::new(5).fixed_label_values(), 5);
        assert_eq!(SeriesFactory::new(200).fixed_label_values(), 26);
    }

    #[test]
    fn test_single_fixed_value() {
        let factory = SeriesFactory::new(1);
        let mut rng = RandomSource::from_seed(99);

        for series in factory.generate(100, &mut rng) {
            assert_eq!(series.fixed_label_value(), Some("a"));
        }
    }

    #[test]
    fn test_generation_is_reproducible() {
        let factory = SeriesFactory::new(4);
        let mut a = RandomSource::from_seed(1234);
        let mut b = RandomSource::from_seed(1234);

        assert_eq!(factory.generate(64, &mut a), factory.generate(64, &mut b));
    }

    proptest! {
        #[test]
        fn test_series_labels(seed in any::<u64>(), fixed in 1u8..=26, count in 0usize..64) {
            let factory = SeriesFactory::new(fixed);
            let mut rng = RandomSource::from_seed(seed);

            for series in factory.generate(count, &mut rng) {
                let labels = series.labels();
                prop_assert!(labels.len() >= 2);
                prop_assert!(labels.len() <= MAX_RANDOM_LABELS + 1);

                let (fixed_label, random_labels) = labels.split_last().unwrap();
                prop_assert_eq!(fixed_label.key(), FIXED_LABEL_KEY);
                prop_assert_eq!(fixed_label.value().len(), 1);
                let index = fixed_label.value().as_bytes()[0].wrapping_sub(b'a');
                prop_assert!(index < fixed);

                // Random keys are lowercase letters only, so they can never collide with the
                // sentinel key, which contains an underscore.
                prop_assert!(random_labels.iter().all(|l| l.key() != FIXED_LABEL_KEY));
                prop_assert!(random_labels
                    .iter()
                    .all(|l| !l.key().is_empty() && !l.value().is_empty()));
            }
        }
    }
}
