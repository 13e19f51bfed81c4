use thiserror::Error;

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Failure taxonomy for the crawl pipeline.
///
/// Only `Config` halts the process. Everything else either degrades a
/// single field, skips a single item, or aborts the run when the output
/// file itself is broken.
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Invalid or missing command line arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// Payload could not be parsed into a report
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Geocoding lookup failed; coordinates stay absent
    #[error("geolocation failed: {0}")]
    GeolocationFailed(String),

    /// Epoch timestamp was missing or unparsable
    #[error("timestamp conversion failed: {0}")]
    TimestampConversion(String),

    /// HTTP request failed
    #[error("network request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing a record to the output file failed
    #[error("failed to write output: {0}")]
    Csv(#[from] csv::Error),

    /// File system operation failed
    #[error("file operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a malformed document error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Create a geolocation error
    pub fn geolocation(msg: impl Into<String>) -> Self {
        Self::GeolocationFailed(msg.into())
    }

    /// Create a timestamp conversion error
    pub fn timestamp(msg: impl Into<String>) -> Self {
        Self::TimestampConversion(msg.into())
    }
}
