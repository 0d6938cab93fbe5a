//! Error types for the agrimarket pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the agrimarket pipeline.
///
/// Per-record anomalies (unparseable prices, unresolved dates) are never
/// errors; they are counted in the batch summary instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The decoded response is neither a list of records nor a single record.
    #[error("Invalid batch shape: expected an array of objects or an object, found {found}")]
    InvalidBatchShape {
        /// Short description of what was found instead.
        found: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid batch shape error.
    pub fn invalid_batch_shape(found: impl Into<String>) -> Self {
        Error::InvalidBatchShape {
            found: found.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether this error rejects the batch structure itself.
    pub fn is_invalid_batch_shape(&self) -> bool {
        matches!(self, Error::InvalidBatchShape { .. })
    }
}
