//! Error types shared by the compiler and the execution engine.

use std::error::Error as StdError;

/// Errors produced while compiling or executing a query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The filter tree is malformed (unknown operator, bad shape,
    /// non-list value for `in`/`not in`).
    #[error("Invalid filter object: {0}")]
    InvalidFilter(String),

    /// A table or column name cannot be used as an identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A unique-constraint specification entry has an unsupported shape.
    #[error("Invalid constraint specification: {0}")]
    InvalidConstraint(String),

    /// The records handed to insert/upsert are unusable.
    #[error("Invalid rows: {0}")]
    InvalidRows(String),

    /// Compiler or engine configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A delete was requested without any bound filter value.
    #[error("unable to remove as there is no filter attributes")]
    NoFilterForDelete,

    /// Failure reported by the database driver, message kept verbatim.
    #[error("{message}")]
    Engine {
        /// Driver message.
        message: String,
        /// Underlying driver error, when available.
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl QueryError {
    /// Builds an [`QueryError::Engine`] from a driver error, keeping its message.
    pub fn engine<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Engine {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Builds an [`QueryError::Engine`] from a bare message.
    pub fn engine_message(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for errors raised by the database rather than the compiler.
    #[must_use]
    pub const fn is_engine(&self) -> bool {
        matches!(self, Self::Engine { .. })
    }
}

/// Result type alias for compiler and engine operations.
pub type Result<T> = std::result::Result<T, QueryError>;
