#[cfg(feature = "http-listener")]
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(feature = "http-listener")]
use ipnet::IpNet;
use quanta::Instant;
use tracing::info;

use crate::common::BuildError;
use crate::population::{Population, PopulationState, PopulationStore};
use crate::random::RandomSource;
use crate::series::{SeriesFactory, DEFAULT_FIXED_LABEL_VALUES, MAX_FIXED_LABEL_VALUES};
use crate::turnover::{TurnoverRate, DEFAULT_TURNOVER_INTERVAL};
#[cfg(feature = "http-listener")]
use crate::{turnover::TurnoverScheduler, ExporterFuture};

/// Default path of the scrape endpoint.
pub const DEFAULT_SCRAPE_PATH: &str = "/metrics";

/// Default port of the scrape endpoint.
pub const DEFAULT_PORT: u16 = 8080;

/// Builder for creating a load generator and its scrape endpoint.
#[derive(Clone, Debug)]
pub struct LoadGeneratorBuilder {
    families: usize,
    max_series_per_family: usize,
    seed: Option<u64>,
    turnover_rate: TurnoverRate,
    turnover_interval: Duration,
    fixed_label_values: u8,
    #[cfg(feature = "http-listener")]
    listen_address: SocketAddr,
    #[cfg(feature = "http-listener")]
    scrape_path: String,
    #[cfg(feature = "http-listener")]
    allowed_addresses: Option<Vec<IpNet>>,
}

impl LoadGeneratorBuilder {
    /// Creates a new [`LoadGeneratorBuilder`] for `families` families of at most
    /// `max_series_per_family` series each.
    pub fn new(families: usize, max_series_per_family: usize) -> Self {
        Self {
            families,
            max_series_per_family,
            seed: None,
            turnover_rate: TurnoverRate::default(),
            turnover_interval: DEFAULT_TURNOVER_INTERVAL,
            fixed_label_values: DEFAULT_FIXED_LABEL_VALUES,
            #[cfg(feature = "http-listener")]
            listen_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            #[cfg(feature = "http-listener")]
            scrape_path: DEFAULT_SCRAPE_PATH.to_owned(),
            #[cfg(feature = "http-listener")]
            allowed_addresses: None,
        }
    }

    /// Sets the seed of the random source.
    ///
    /// Two load generators built with the same seed, and scraped and turned over in the same order,
    /// expose exactly the same series and values.
    ///
    /// Defaults to the current time, in nanoseconds since the Unix epoch.
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the turnover rate, as the denominator of the share of each family to replace per cycle.
    ///
    /// A rate of zero disables turnover.
    ///
    /// Defaults to 6.
    #[must_use]
    pub fn turnover_rate(mut self, rate: u32) -> Self {
        self.turnover_rate = TurnoverRate::new(rate);
        self
    }

    /// Sets the interval between turnover cycles.
    ///
    /// Defaults to 15 seconds.
    #[must_use]
    pub fn turnover_interval(mut self, interval: Duration) -> Self {
        self.turnover_interval = interval;
        self
    }

    /// Sets how many distinct values the fixed label takes.
    ///
    /// Defaults to 2.
    ///
    /// ## Errors
    ///
    /// If `count` is zero or greater than 26, an error variant will be returned.
    pub fn fixed_label_values(mut self, count: u8) -> Result<Self, BuildError> {
        if count == 0 || count > MAX_FIXED_LABEL_VALUES {
            return Err(BuildError::InvalidFixedLabelValues(count));
        }

        self.fixed_label_values = count;
        Ok(self)
    }

    /// Configures the address the scrape endpoint listens on.
    ///
    /// Defaults to `0.0.0.0:8080`.
    #[cfg(feature = "http-listener")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http-listener")))]
    #[must_use]
    pub fn with_http_listener(mut self, addr: impl Into<SocketAddr>) -> Self {
        self.listen_address = addr.into();
        self
    }

    /// Sets the request path of the scrape endpoint.
    ///
    /// Defaults to `/metrics`.
    ///
    /// ## Errors
    ///
    /// If the path does not start with a `/`, an error variant will be returned.
    #[cfg(feature = "http-listener")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http-listener")))]
    pub fn scrape_path<P>(mut self, path: P) -> Result<Self, BuildError>
    where
        P: Into<String>,
    {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(BuildError::InvalidScrapePath(path));
        }

        self.scrape_path = path;
        Ok(self)
    }

    /// Adds an IP address or subnet to the allowlist for the scrape endpoint.
    ///
    /// If a client makes a request to the scrape endpoint and their IP is not present in the
    /// allowlist, either directly or within any of the allowed subnets, they will receive a 403
    /// Forbidden response.
    ///
    /// Defaults to allowing all IPs.
    ///
    /// ## Errors
    ///
    /// If the given address cannot be parsed into an IP address or subnet, an error variant will be
    /// returned describing the error.
    #[cfg(feature = "http-listener")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http-listener")))]
    pub fn add_allowed_address<A>(mut self, address: A) -> Result<Self, BuildError>
    where
        A: AsRef<str>,
    {
        use std::str::FromStr;

        let address = IpNet::from_str(address.as_ref())
            .or_else(|_| IpAddr::from_str(address.as_ref()).map(IpNet::from))
            .map_err(|e| BuildError::InvalidAllowlistAddress(e.to_string()))?;
        self.allowed_addresses.get_or_insert(vec![]).push(address);

        Ok(self)
    }

    /// Gets the seed this builder will use, picking one from the clock if none was set.
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos() as u64)
                .unwrap_or_default()
        })
    }

    /// Generates the population and returns a store holding it.
    ///
    /// Nothing runs in the background: callers drive snapshots and turnover cycles themselves.
    pub fn build_store(&self) -> PopulationStore {
        let seed = self.seed();
        let start = Instant::now();

        let factory = SeriesFactory::new(self.fixed_label_values);
        let mut rng = RandomSource::from_seed(seed);
        let population =
            Population::generate(self.families, self.max_series_per_family, &factory, &mut rng);

        let elapsed = Instant::now() - start;
        info!(
            seed,
            families = population.families().len(),
            series = population.series_count(),
            ?elapsed,
            "done generating random series"
        );
        for family in population.families() {
            info!(name = family.name(), series = family.len(), "generated family");
        }

        PopulationStore::new(PopulationState::new(population, factory, rng))
    }

    /// Builds the population, starts turnover, and returns the store and the scrape endpoint.
    ///
    /// The returned future serves scrapes until it is dropped, and must be driven by the caller.
    ///
    /// ## Panics
    ///
    /// This method must be called from within an existing Tokio runtime or it will panic.
    ///
    /// ## Errors
    ///
    /// If the HTTP listener cannot bind to the listen address, an error variant will be returned
    /// describing the error.
    #[cfg(feature = "http-listener")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http-listener")))]
    pub fn build(self) -> Result<(PopulationStore, ExporterFuture), BuildError> {
        let store = self.build_store();

        let exporter = crate::listener::new_http_listener(
            store.clone(),
            self.listen_address,
            self.scrape_path.clone(),
            self.allowed_addresses.clone(),
        )?;
        info!(address = %self.listen_address, path = %self.scrape_path, "serving metrics");

        match TurnoverScheduler::new(store.clone(), self.turnover_rate, self.turnover_interval) {
            Some(scheduler) => {
                info!(
                    rate = self.turnover_rate.denominator(),
                    interval = ?self.turnover_interval,
                    "series turnover enabled"
                );
                scheduler.spawn();
            }
            None => info!("series turnover disabled"),
        }

        Ok((store, exporter))
    }
}
