//! Server error types

use thiserror::Error;

/// Errors that can occur in the annex server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Page template could not be read or rendered
    #[error("template error: {0}")]
    Template(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
