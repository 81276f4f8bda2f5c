use thiserror::Error as ThisError;

/// Errors that could occur while building or installing a load generator.
#[derive(Debug, ThisError)]
pub enum BuildError {
    /// The given address could not be parsed as an IP address or subnet.
    #[error("failed to parse address as a valid IP address/subnet: {0}")]
    InvalidAllowlistAddress(String),

    /// The scrape path is not an absolute path.
    #[error("scrape path must start with '/': {0:?}")]
    InvalidScrapePath(String),

    /// The fixed label cardinality is outside of `1..=26`.
    #[error("fixed label values must be between 1 and 26, got {0}")]
    InvalidFixedLabelValues(u8),

    /// Binding/listening to the given address did not succeed.
    #[error("failed to create HTTP listener: {0}")]
    FailedToCreateHTTPListener(String),
}

/// Errors that could occur while an exporter is running.
#[derive(Debug, ThisError)]
pub enum ExporterError {
    /// The HTTP listener could not be handed over to the runtime.
    #[error("HTTP listener failed: {0}")]
    HttpListener(#[from] std::io::Error),
}
