use thiserror::Error;

/// The unified error type for the `barlist_engine` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The document adapter could not locate the expected structure.
    /// Fatal for that provider/date; the run is recorded as `fetch_failed`.
    #[error("bar list parse failed: {0}")]
    Parse(#[from] crate::adapters::ParseError),

    /// A fund-metrics file exists but could not be read or decoded.
    #[error("fund metrics unavailable: {0}")]
    Metrics(#[from] crate::metrics::MetricsError),

    /// The verification result could not be published atomically.
    #[error("report write failed: {0}")]
    Report(#[from] crate::report::ReportError),

    /// An error related to configuration.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A generic I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
