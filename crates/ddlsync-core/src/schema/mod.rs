//! Schema model: live tables, indexes, routines and types, the shared
//! registry the reconciler keeps them in, and column diffing.

mod catalog;
mod column;
mod diff;
mod index;
mod registry;
mod table;
mod types;

pub use catalog::{PgType, PgTypeKind, Routine, RoutineKind, SchemaSnapshot};
pub use column::{Column, ColumnInfo, StringColumn};
pub use diff::{
    add_columns_sql, alter_clauses, alter_table_sql, backfill_sql, diff_column, normalize_default,
    quote_ident, FlagColumn,
};
pub use index::{
    normalize_expression, ForeignKey, ForeignKeyAction, Index, IndexChange, IndexComparison,
};
pub use registry::SchemaRegistry;
pub use table::{StringTable, Table, TableInfo, TableKind};
pub use types::{
    alter_target_type, canonical_type, is_character_type, is_serial, type_length, typmod_length,
    CanonicalType,
};
