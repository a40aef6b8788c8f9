//! Error types for the Sunbird tools.
//!
//! Library crates use [`SunbirdError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all operations that can fail a whole request.
///
/// Per-node failures during graph resolution are *not* represented here; they
/// are recorded as diagnostics by the resolver and never abort a traversal.
#[derive(Debug, thiserror::Error)]
pub enum SunbirdError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the upstream service.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Request parameters rejected before any network call.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        details: Vec<String>,
    },

    /// A content identifier failed the syntax check.
    #[error("invalid content id '{id}': {reason}")]
    InvalidFormat { id: String, reason: String },

    /// The upstream service has no record for the identifier.
    #[error("content not found: {0}")]
    NotFound(String),

    /// The upstream service answered with a non-success status.
    #[error("upstream request failed with status {status}: {detail}")]
    Upstream { status: u16, detail: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SunbirdError>;

impl SunbirdError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error without itemized details.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            details: Vec::new(),
        }
    }

    /// Create a validation error carrying every individual problem found.
    pub fn validation_with(msg: impl Into<String>, details: Vec<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            details,
        }
    }

    /// Create an identifier format error.
    pub fn invalid_format(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Itemized problems attached to a validation error, if any.
    pub fn details(&self) -> &[String] {
        match self {
            Self::Validation { details, .. } => details,
            _ => &[],
        }
    }
}

/// Longest upstream error body carried into an error or diagnostic.
pub const MAX_DETAIL_LEN: usize = 512;

/// Cut `detail` to at most `max` bytes without splitting a character.
pub fn truncate_detail(detail: &mut String, max: usize) {
    if detail.len() > max {
        let mut end = max;
        while !detail.is_char_boundary(end) {
            end -= 1;
        }
        detail.truncate(end);
    }
}
