//! Unified error type for the streamgate workspace.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for the HTTP layer to derive a status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in streamgate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "stream", "song").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller presented a missing, expired or forged token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but the request is not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A stream folder or quality selector resolved outside its namespace.
    ///
    /// The offending key is deliberately not carried so it can never leak
    /// into a response body.
    #[error("Forbidden: path rejected")]
    InvalidObjectKey,

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The object-storage backend failed or returned something unusable.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Startup configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::InvalidObjectKey => 403,
            Error::Validation(_) => 400,
            Error::Upstream(_) => 502,
            Error::Config(_) => 500,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
