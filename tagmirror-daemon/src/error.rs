use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Error surface for the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] tagmirror_core::ConfigError),

    #[error("renderer error: {0}")]
    Render(#[from] tagmirror_renderer::RenderError),

    #[error("task failure: {0}")]
    Task(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}

/// Per-request failures; each maps onto one HTTP status.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("404 page not found")]
    NotFound,

    #[error("Unable to read directory")]
    ReadDir(#[source] std::io::Error),

    #[error("Unable to render directory listing")]
    Render(#[source] tagmirror_renderer::RenderError),

    #[error("Unable to open file")]
    Open(#[source] std::io::Error),

    #[error("Unable to read file")]
    Read(#[source] std::io::Error),

    #[error("Unable to decompress file")]
    Decompress(#[source] std::io::Error),

    #[error("Decompressed file too large (max 50MB)")]
    TooLarge,

    #[error("request handler failed")]
    Join,
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::NotFound => StatusCode::NOT_FOUND,
            ServeError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match std::error::Error::source(&self) {
                Some(source) => tracing::error!(error = %source, "{self}"),
                None => tracing::error!("{self}"),
            }
        }
        (status, format!("{self}\n")).into_response()
    }
}
