use thiserror::Error;

/// Why a statement could not be rendered. These are caller mistakes and
/// are always returned, never logged away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("wrong number of arguments: expected {expected}, got {got}")]
    WrongArgsLen { expected: usize, got: usize },

    #[error("column {column} not found in table {table}")]
    NotFoundColumn { table: String, column: String },
}
