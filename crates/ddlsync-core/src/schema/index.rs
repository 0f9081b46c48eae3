//! Indexes and constraint-backed indexes.

use std::fmt;

use serde::Serialize;

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ForeignKeyAction {
    /// No action.
    #[default]
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// The referencing side of a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: String,
    /// Referenced columns; empty when the constraint relies on the
    /// referenced table's primary key.
    pub columns: Vec<String>,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

/// An index, or a constraint that PostgreSQL backs with one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub name: String,
    /// Owning table.
    pub table: String,
    /// Tracked columns in order. For expression elements this is the first
    /// plain column inside the expression.
    pub columns: Vec<String>,
    /// Rendered element list, set only when some element is an expression.
    pub expr: Option<String>,
    pub unique: bool,
    /// Access method from `USING`.
    pub method: Option<String>,
    pub foreign: Option<ForeignKey>,
    /// Partial index predicate.
    pub where_clause: Option<String>,
    /// True when declared with `ALTER TABLE ... ADD CONSTRAINT`.
    pub constraint: bool,
}

impl Index {
    /// A plain btree index over `columns`.
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            expr: None,
            unique: false,
            method: None,
            foreign: None,
            where_clause: None,
            constraint: false,
        }
    }

    /// Compares this declared index with the live index of the same name.
    #[must_use]
    pub fn compare(&self, live: &Self) -> IndexComparison {
        let mut comparison = IndexComparison::default();

        if self.columns.len() == live.columns.len() {
            for (position, (declared, current)) in
                self.columns.iter().zip(&live.columns).enumerate()
            {
                if !declared.eq_ignore_ascii_case(current) {
                    comparison.changes.push(IndexChange::Column {
                        position,
                        live: current.clone(),
                        declared: declared.clone(),
                    });
                }
            }
        } else {
            comparison.changes.push(IndexChange::ColumnCount {
                live: live.columns.len(),
                declared: self.columns.len(),
            });
        }

        match (&self.expr, &live.expr) {
            (None, None) => {}
            (Some(declared), Some(current)) => {
                if normalize_expression(declared) != normalize_expression(current) {
                    comparison.changes.push(IndexChange::Expression);
                } else if declared != current {
                    comparison.benign_expression = true;
                }
            }
            _ => comparison.changes.push(IndexChange::Expression),
        }

        if self.unique != live.unique {
            comparison.changes.push(IndexChange::Uniqueness {
                live: live.unique,
                declared: self.unique,
            });
        }

        if let Some(declared) = &self.foreign {
            let same = live.foreign.as_ref().is_some_and(|current| {
                declared.table.eq_ignore_ascii_case(&current.table)
                    && (declared.columns.is_empty() || declared.columns == current.columns)
                    && declared.on_update == current.on_update
                    && declared.on_delete == current.on_delete
            });
            if !same {
                comparison.changes.push(IndexChange::ForeignKey);
            }
        }

        comparison
    }
}

/// Expression text with every closing parenthesis removed, so
/// `lower(email)` and `lower(email` compare equal.
#[must_use]
pub fn normalize_expression(expr: &str) -> String {
    expr.replace(')', "").trim().to_string()
}

/// Outcome of [`Index::compare`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexComparison {
    pub changes: Vec<IndexChange>,
    /// Expressions differ only in closing parentheses.
    pub benign_expression: bool,
}

impl IndexComparison {
    /// True when the index must be dropped and recreated.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// One structural difference between a declared and a live index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexChange {
    ColumnCount { live: usize, declared: usize },
    Column { position: usize, live: String, declared: String },
    Expression,
    Uniqueness { live: bool, declared: bool },
    ForeignKey,
}

impl fmt::Display for IndexChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnCount { live, declared } => {
                write!(f, "column count {live} -> {declared}")
            }
            Self::Column {
                position,
                live,
                declared,
            } => write!(f, "column #{position} {live} -> {declared}"),
            Self::Expression => f.write_str("expression"),
            Self::Uniqueness { live, declared } => write!(f, "unique {live} -> {declared}"),
            Self::ForeignKey => f.write_str("foreign key target or actions"),
        }
    }
}
