//! Error types for reconciliation.

use std::path::PathBuf;

use ddlsync_core::builder::BuilderError;
use ddlsync_core::classify::{DbError, ErrorKind};

/// Errors raised while reconciling DDL files against the database.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The database rejected a statement.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Driver-level failure (connecting, decoding rows).
    #[error("Driver error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A DDL file could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No handler recognized the statement.
    #[error("Unknown SQL: {0}")]
    UnknownSql(String),

    /// The statement declares a different object than its file is named for.
    #[error("Name mismatch: file declares '{expected}' but statement names '{found}'")]
    NameMismatch { expected: String, found: String },

    #[error("Table not found: {0}")]
    NotFoundTable(String),

    #[error("Column {column} not found in table {table}")]
    NotFoundColumn { table: String, column: String },

    /// A function file without any `CREATE FUNCTION|PROCEDURE` header.
    #[error("No function or procedure header found in {0}")]
    NotFoundRoutine(String),

    /// An existing object has a different kind than the statement expects.
    #[error("Wrong type for '{name}': expected {expected}, found {found}")]
    WrongType {
        name: String,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Classification of the underlying driver error, if there is one.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Database(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, MigrateError>;
