//! A synthetic Prometheus scrape target that simulates series cardinality churn.
//!
//! A load generator fabricates a population of gauge families, each holding a random number of
//! series with random labels, and serves it to scrapers. Every scrape redraws the value of every
//! series. In the background, a turnover task periodically replaces a share of the series in each
//! family with new ones, so that scrapers see series appear and disappear over time.
//!
//! Everything random, from label contents to sample values, is drawn from one seeded source held
//! under the same lock as the population, so a run is reproducible from its seed.
//!
//! ## Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use metrics_churn::LoadGeneratorBuilder;
//!
//! let (_store, exporter) = LoadGeneratorBuilder::new(10, 100)
//!     .random_seed(42)
//!     .turnover_rate(6)
//!     .build()?;
//! exporter.await?;
//! # Ok(())
//! # }
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "http-listener")]
use std::{future::Future, pin::Pin};

mod builder;
pub use self::builder::{LoadGeneratorBuilder, DEFAULT_PORT, DEFAULT_SCRAPE_PATH};

mod common;
pub use self::common::{BuildError, ExporterError};

mod exposition;
pub use self::exposition::ExpositionFormat;

mod family;
pub use self::family::{generate_families, series_count_bounds, Family, MetricType};

pub mod formatting;

#[cfg(feature = "http-listener")]
mod listener;

mod population;
pub use self::population::{Population, PopulationState, PopulationStore};

#[cfg(feature = "protobuf")]
#[cfg_attr(docsrs, doc(cfg(feature = "protobuf")))]
pub mod protobuf;

mod random;
pub use self::random::{RandomSource, MAX_STRING_LENGTH};

mod series;
pub use self::series::{
    Label, Series, SeriesFactory, DEFAULT_FIXED_LABEL_VALUES, FIXED_LABEL_KEY,
    MAX_FIXED_LABEL_VALUES, MAX_RANDOM_LABELS,
};

pub mod turnover;
pub use self::turnover::{TurnoverPolicy, TurnoverRate, TurnoverReport, TurnoverScheduler};

/// Convenience type for Future implementing an exporter.
#[cfg(feature = "http-listener")]
#[cfg_attr(docsrs, doc(cfg(feature = "http-listener")))]
pub type ExporterFuture = Pin<Box<dyn Future<Output = Result<(), ExporterError>> + Send + 'static>>;
