//! Routines, user-defined types and the full schema snapshot.

use std::fmt;

use serde::Serialize;

use super::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RoutineKind {
    Function,
    Procedure,
}

impl RoutineKind {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
        }
    }
}

/// A function or procedure signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Routine {
    pub name: String,
    pub kind: RoutineKind,
    /// Identity arguments, as accepted by `DROP FUNCTION name(...)`.
    pub arguments: String,
}

impl Routine {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: RoutineKind, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            arguments: arguments.into(),
        }
    }

    /// `DROP FUNCTION IF EXISTS name(args)`.
    #[must_use]
    pub fn drop_sql(&self) -> String {
        format!(
            "DROP {} IF EXISTS {}({})",
            self.kind.as_sql(),
            self.name,
            self.arguments
        )
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PgTypeKind {
    Enum,
    Composite,
    Domain,
    Other,
}

/// A user-defined type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PgType {
    pub name: String,
    pub kind: PgTypeKind,
    /// Enum labels in sort order; empty for other kinds.
    pub labels: Vec<String>,
}

impl PgType {
    #[must_use]
    pub fn enumeration(name: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: PgTypeKind::Enum,
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        }
    }
}

/// Everything introspection returns in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<Table>,
    pub routines: Vec<Routine>,
    pub types: Vec<PgType>,
}
