//! # Errors Module
//!
//! A single error type for every fallible Cask ORM operation. Database errors
//! are carried unchanged; the remaining variants describe misuse of the model
//! lifecycle or a missing row.

use thiserror::Error;

/// Errors produced by Cask ORM.
#[derive(Debug, Error)]
pub enum Error {
    /// An error reported by the database driver (constraint violations,
    /// connection failures, ...). Propagated without translation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A `*_or_fail` lookup matched no row.
    #[error("no `{table}` row found where {column} = {value}")]
    ModelNotFound { table: String, column: String, value: String },

    /// A write was attempted on an instance that has been deleted.
    #[error("cannot modify `{table}` instance: it has been deleted")]
    FrozenInstance { table: String },

    /// The primary key of a persisted instance was about to change.
    #[error("primary key `{column}` of persisted `{table}` instance cannot change")]
    ImmutablePrimaryKey { table: String, column: String },

    /// The operation needs a row that was never inserted.
    #[error("`{table}` instance has not been persisted")]
    NotPersisted { table: String },

    /// A named scope was invoked that the model does not define.
    #[error("scope `{scope}` is not defined for `{table}`")]
    UnknownScope { table: String, scope: String },

    /// An attribute could not be converted to the requested Rust type.
    #[error("attribute `{column}` holds {found}, expected {expected}")]
    Conversion { column: String, expected: &'static str, found: String },

    /// A value could not be bound as a query argument.
    #[error("failed to bind query argument: {0}")]
    Encode(String),

    /// The transaction was already committed or rolled back.
    #[error("transaction is no longer active")]
    TransactionClosed,

    /// A model names a connection that was never registered.
    #[error("connection `{0}` is not registered")]
    UnknownConnection(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for the "model not found" kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ModelNotFound { .. })
    }

    /// Returns `true` when the error comes from a deleted (frozen) instance.
    pub fn is_frozen(&self) -> bool {
        matches!(self, Error::FrozenInstance { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
