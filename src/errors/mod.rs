/// Unified error handling module
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Season configuration with a month outside 1..=12 or a day outside 1..=31.
    #[error("invalid season bounds: {0}")]
    InvalidSeasonBounds(String),

    /// A downloader parameter has neither a site-specific row nor a default row.
    #[error("missing parameter '{key}' for site {site_id} (no default either)")]
    MissingParameter { key: String, site_id: i16 },

    /// A parameter row exists but its value does not parse.
    #[error("parameter '{key}' has unparseable value '{value}'")]
    InvalidParameter { key: String, value: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// More than one history row for a (site, satellite, product) key. The key
    /// is supposed to be unique; picking one silently would hide a data
    /// integrity violation.
    #[error("duplicate history records for product '{product_name}': found {count}, expected at most 1")]
    DuplicateRecord { product_name: String, count: usize },

    /// A numeric status id that maps to no known download status.
    #[error("unknown download status id: {0}")]
    UnknownStatus(i16),
}

/// Type alias for tracker results
pub type TrackerResult<T> = Result<T, TrackerError>;
