//! Tables, views and the synthetic [`StringTable`].

use serde::Serialize;

use super::column::{Column, ColumnInfo, StringColumn};
use super::index::Index;
use crate::grammar::CreateTable;

/// What kind of relation a [`Table`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableKind {
    Table,
    View,
    MaterializedView,
    PartitionedTable,
}

impl TableKind {
    /// Maps `pg_class.relkind`.
    #[must_use]
    pub fn from_relkind(relkind: &str) -> Option<Self> {
        match relkind {
            "r" => Some(Self::Table),
            "v" => Some(Self::View),
            "m" => Some(Self::MaterializedView),
            "p" => Some(Self::PartitionedTable),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_view(self) -> bool {
        matches!(self, Self::View | Self::MaterializedView)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::MaterializedView => "materialized view",
            Self::PartitionedTable => "partitioned table",
        }
    }
}

/// Read access to a relation's name and columns.
pub trait TableInfo {
    type Column: ColumnInfo;

    fn name(&self) -> &str;

    /// Columns in ordinal order.
    fn columns(&self) -> &[Self::Column];

    fn find_column(&self, name: &str) -> Option<&Self::Column> {
        self.columns().iter().find(|c| c.name() == name)
    }
}

/// A live table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub comment: Option<String>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            columns: Vec::new(),
            indexes: Vec::new(),
            comment: None,
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The table PostgreSQL would report right after `create` runs.
    #[must_use]
    pub fn from_declaration(create: &CreateTable) -> Self {
        Self::new(&create.name, TableKind::Table)
            .with_columns(create.columns.iter().map(Column::from_decl).collect())
    }

    #[must_use]
    pub fn find_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Names of the primary key columns, in ordinal order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key())
            .map(ColumnInfo::name)
            .collect()
    }
}

impl TableInfo for Table {
    type Column = Column;

    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// A table described only by column names, for building SQL in tests and
/// ad-hoc tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringTable {
    name: String,
    columns: Vec<StringColumn>,
}

impl StringTable {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<StringColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Columns named in `names`, with `primary` marked as the key.
    #[must_use]
    pub fn with_names(name: impl Into<String>, names: &[&str], primary: &[&str]) -> Self {
        let columns = names
            .iter()
            .map(|n| {
                let column = StringColumn::new(*n);
                if primary.contains(n) {
                    column.primary_key()
                } else {
                    column
                }
            })
            .collect();
        Self::new(name, columns)
    }
}

impl TableInfo for StringTable {
    type Column = StringColumn;

    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[StringColumn] {
        &self.columns
    }
}
