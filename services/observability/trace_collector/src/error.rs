//! Errors that can occur in the diagnostic listener

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error("Failed to bind diagnostic listener to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for diagnostic listener operations
pub type Result<T> = std::result::Result<T, DiagnosticError>;
