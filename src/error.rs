// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Error types shared by the ingestion path and the background jobs

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Envelope could not be decoded or is missing a field
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Catalog (SQLite) failure
    #[error("catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    /// A uniqueness constraint would have been violated
    #[error("catalog integrity violation: {0}")]
    Integrity(String),

    /// File system failure on a known path
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External renderer or time-series tool failed
    #[error("{tool} failed: {reason}")]
    Renderer { tool: String, reason: String },

    /// Outbound publish could not be queued
    #[error("publish failed: {0}")]
    Publish(String),

    /// Unrecoverable startup problem
    #[error("fatal: {0}")]
    Fatal(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn renderer(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Renderer {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Worth retrying on the next scheduled cycle
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io { .. } | Error::Renderer { .. } | Error::Publish(_) | Error::Catalog(_)
        )
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::Malformed(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Malformed(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Malformed(format!("invalid base64 payload: {}", e))
    }
}
