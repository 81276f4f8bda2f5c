use std::net::{SocketAddr, ToSocketAddrs};
use std::num::ParseIntError;
use std::time::Duration;

use getopts::{Matches, Options};
use metrics_churn::{BuildError, LoadGeneratorBuilder, DEFAULT_PORT, DEFAULT_SCRAPE_PATH};
use thiserror::Error as ThisError;

const DEFAULT_LISTEN_ADDRESS: &str = ":8080";
const DEFAULT_TURNOVER_RATE: &str = "6";
const DEFAULT_TURNOVER_INTERVAL: &str = "15s";
const DEFAULT_FIXED_LABEL_VALUES: &str = "2";

/// Errors from parsing the command line.
#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("failed to parse command line args: {0}")]
    Options(#[from] getopts::Fail),

    #[error("expected exactly 2 positional arguments, got {0}")]
    Usage(usize),

    #[error("{name} must be an integer: {source}")]
    InvalidInteger {
        name: &'static str,
        #[source]
        source: ParseIntError,
    },

    #[error("turnover interval is not a valid duration: {0}")]
    InvalidDuration(#[from] humantime::DurationError),

    #[error("listen address {0:?} is not a valid host:port")]
    InvalidListenAddress(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl CliError {
    /// Gets the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Options(_) | CliError::Usage(_) => 1,
            _ => 2,
        }
    }

    /// Whether the usage text should be printed alongside this error.
    pub fn wants_usage(&self) -> bool {
        matches!(self, CliError::Options(_) | CliError::Usage(_) | CliError::InvalidInteger { .. })
    }
}

/// What the command line asked for.
#[derive(Debug)]
pub enum Command {
    Help,
    Serve(LoadGeneratorBuilder),
}

pub fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt(
        "l",
        "listen-address",
        "the address and port on which to serve metrics (default :8080)",
        "ADDRESS",
    );
    opts.optopt(
        "s",
        "random-seed",
        "the seed to use, for deterministic metrics generation (defaults to current time)",
        "INTEGER",
    );
    opts.optopt(
        "t",
        "turnover-rate",
        "the minimum share of series to replace per family at each turnover interval, as the \
         denominator of a fraction of the total series (default 6, 0 to disable)",
        "INTEGER",
    );
    opts.optopt(
        "i",
        "turnover-interval",
        "the interval at which to replace series in each family (default 15s)",
        "DURATION",
    );
    opts.optopt(
        "f",
        "fixed-label-values",
        "the number of distinct values of the fixed label, 1 to 26 (default 2)",
        "INTEGER",
    );
    opts.optopt("p", "scrape-path", "the path of the scrape endpoint (default /metrics)", "PATH");
    opts.optmulti(
        "a",
        "allow",
        "only serve clients from this address or subnet (may be repeated)",
        "CIDR",
    );
    opts.optflag("h", "help", "print this help menu");

    opts
}

pub fn usage(program: &str, opts: &Options) -> String {
    let brief = format!("Usage: {program} [options] NUM_RANDOM_FAMILIES MAX_SERIES_PER_FAMILY");
    opts.usage(&brief)
}

/// Parses the arguments following the program name.
pub fn parse(opts: &Options, args: &[String]) -> Result<Command, CliError> {
    let matches = opts.parse(args)?;

    if matches.opt_present("help") {
        return Ok(Command::Help);
    }

    if matches.free.len() != 2 {
        return Err(CliError::Usage(matches.free.len()));
    }

    let families = parse_integer("NUM_RANDOM_FAMILIES", &matches.free[0])?;
    let max_series = parse_integer("MAX_SERIES_PER_FAMILY", &matches.free[1])?;

    let mut builder = LoadGeneratorBuilder::new(families, max_series)
        .turnover_rate(opt_integer(&matches, "turnover-rate", DEFAULT_TURNOVER_RATE)?)
        .turnover_interval(parse_interval(
            matches.opt_str("turnover-interval").as_deref().unwrap_or(DEFAULT_TURNOVER_INTERVAL),
        )?)
        .fixed_label_values(opt_integer(
            &matches,
            "fixed-label-values",
            DEFAULT_FIXED_LABEL_VALUES,
        )?)?
        .with_http_listener(parse_listen_address(
            matches.opt_str("listen-address").as_deref().unwrap_or(DEFAULT_LISTEN_ADDRESS),
        )?)
        .scrape_path(
            matches.opt_str("scrape-path").unwrap_or_else(|| DEFAULT_SCRAPE_PATH.to_owned()),
        )?;

    if let Some(seed) = matches.opt_str("random-seed") {
        builder = builder.random_seed(parse_seed(&seed)?);
    }

    for address in matches.opt_strs("allow") {
        builder = builder.add_allowed_address(address)?;
    }

    Ok(Command::Serve(builder))
}

fn opt_integer<T>(matches: &Matches, name: &'static str, default: &str) -> Result<T, CliError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    let value = matches.opt_str(name);
    parse_integer(name, value.as_deref().unwrap_or(default))
}

fn parse_integer<T>(name: &'static str, value: &str) -> Result<T, CliError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    value.trim().parse().map_err(|source| CliError::InvalidInteger { name, source })
}

/// Parses a seed, accepting negative values by reinterpreting their two's complement bits.
fn parse_seed(value: &str) -> Result<u64, CliError> {
    match parse_integer::<i64>("random-seed", value) {
        Ok(seed) => Ok(seed as u64),
        Err(e) => value.trim().parse::<u64>().map_err(|_| e),
    }
}

fn parse_interval(value: &str) -> Result<Duration, CliError> {
    Ok(humantime::parse_duration(value)?)
}

/// Parses a listen address, where a missing host (`:8080`) means every interface.
pub fn parse_listen_address(value: &str) -> Result<SocketAddr, CliError> {
    let invalid = || CliError::InvalidListenAddress(value.to_owned());

    let qualified = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None if value.is_empty() => format!("0.0.0.0:{DEFAULT_PORT}"),
        None => value.to_owned(),
    };

    qualified.to_socket_addrs().map_err(|_| invalid())?.next().ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::{opts, parse, parse_listen_address, usage, CliError, Command};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn builder(list: &[&str]) -> metrics_churn::LoadGeneratorBuilder {
        match parse(&opts(), &args(list)) {
            Ok(Command::Serve(builder)) => builder,
            other => panic!("expected a serve command, got {other:?}"),
        }
    }

    #[test]
    fn test_help() {
        assert!(matches!(parse(&opts(), &args(&["--help"])), Ok(Command::Help)));
        assert!(matches!(parse(&opts(), &args(&["-h", "1"])), Ok(Command::Help)));
    }

    #[test]
    fn test_usage_mentions_positionals() {
        let text = usage("metrics-churn", &opts());
        assert!(text.contains("NUM_RANDOM_FAMILIES MAX_SERIES_PER_FAMILY"));
        assert!(text.contains("--turnover-rate"));
    }

    #[test]
    fn test_positional_count() {
        for list in [&[][..], &["1"][..], &["1", "2", "3"][..]] {
            let err = parse(&opts(), &args(list)).unwrap_err();
            assert!(matches!(err, CliError::Usage(_)));
            assert_eq!(err.exit_code(), 1);
            assert!(err.wants_usage());
        }
    }

    #[test]
    fn test_bad_integers() {
        let err = parse(&opts(), &args(&["ten", "4"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidInteger { name: "NUM_RANDOM_FAMILIES", .. }));
        assert_eq!(err.exit_code(), 2);

        let err = parse(&opts(), &args(&["10", "four"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidInteger { name: "MAX_SERIES_PER_FAMILY", .. }));

        let err = parse(&opts(), &args(&["--turnover-rate", "x", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidInteger { name: "turnover-rate", .. }));

        let err = parse(&opts(), &args(&["--random-seed", "1.5", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidInteger { name: "random-seed", .. }));
    }

    #[test]
    fn test_unknown_flag() {
        let err = parse(&opts(), &args(&["--nope", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::Options(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_invalid_values() {
        let err = parse(&opts(), &args(&["-i", "soon", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidDuration(_)));

        let err = parse(&opts(), &args(&["-f", "0", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::Build(_)));
        assert_eq!(err.exit_code(), 2);

        let err = parse(&opts(), &args(&["-p", "metrics", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::Build(_)));

        let err = parse(&opts(), &args(&["-a", "nowhere", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::Build(_)));

        let err = parse(&opts(), &args(&["-l", "not an address", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidListenAddress(_)));
    }

    #[test]
    fn test_seed_is_used() {
        let a = builder(&["--random-seed", "42", "3", "8"]).build_store();
        let b = builder(&["-s", "42", "3", "8"]).build_store();
        assert_eq!(a.lock().population(), b.lock().population());

        assert_eq!(builder(&["-s", "7", "1", "1"]).seed(), 7);
    }

    #[test]
    fn test_negative_and_large_seeds() {
        assert_eq!(builder(&["--random-seed=-5", "1", "2"]).seed(), (-5i64) as u64);
        assert_eq!(builder(&["--random-seed=-1", "1", "2"]).seed(), u64::MAX);
        assert_eq!(builder(&["--random-seed", "18446744073709551615", "1", "2"]).seed(), u64::MAX);

        let err = parse(&opts(), &args(&["--random-seed=-", "1", "2"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidInteger { name: "random-seed", .. }));
    }

    #[test]
    fn test_full_flag_set() {
        let store = builder(&[
            "--listen-address",
            "127.0.0.1:9100",
            "--turnover-rate",
            "0",
            "--turnover-interval",
            "1m 30s",
            "--fixed-label-values",
            "5",
            "--scrape-path",
            "/scrape",
            "--allow",
            "127.0.0.1",
            "--allow",
            "10.0.0.0/8",
            "--random-seed",
            "1",
            "2",
            "6",
        ])
        .build_store();

        let state = store.lock();
        assert_eq!(state.population().families().len(), 2);
        for series in state.population().families().iter().flat_map(|f| f.series()) {
            let value = series.fixed_label_value().unwrap();
            assert!(("a"..="e").contains(&value));
        }
    }

    #[test]
    fn test_parse_listen_address() {
        let all = |port| SocketAddr::from(([0, 0, 0, 0], port));

        assert_eq!(parse_listen_address(":8080").unwrap(), all(8080));
        assert_eq!(parse_listen_address("").unwrap(), all(8080));
        assert_eq!(
            parse_listen_address("127.0.0.1:9000").unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 9000))
        );
        assert_eq!(
            parse_listen_address("[::1]:9000").unwrap(),
            "[::1]:9000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_listen_address(":notaport").is_err());
    }
}
