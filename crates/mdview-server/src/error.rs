//! Error types for the preview server.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Server error type.
///
/// Port and watch failures occur during startup and are surfaced by the
/// caller; only file read failures reach a viewer as a response.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No listening socket could be bound in the attempted range.
    #[error("no available port found between {first} and {last}")]
    PortExhausted {
        /// First port attempted.
        first: u16,
        /// Last port attempted.
        last: u16,
    },

    /// The file watch could not be established.
    #[error("cannot watch {}: {source}", path.display())]
    Watch {
        /// Path that was being watched.
        path: PathBuf,
        /// Underlying watcher error.
        source: notify::Error,
    },

    /// The served file could not be read.
    #[error("Error rendering markdown: {0}")]
    FileRead(std::io::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
