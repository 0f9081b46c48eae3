//! The database contract the reconciler runs against.

use ddlsync_core::builder::SqlValue;
use ddlsync_core::classify::DbError;
use ddlsync_core::schema::{SchemaSnapshot, Table, TableKind};

/// What the reconciler needs from a database. Statements are awaited one
/// at a time; timeouts and cancellation belong to the implementation.
#[allow(async_fn_in_trait)]
pub trait Connection {
    /// Executes one statement, or a whole file of them when `args` is
    /// empty.
    async fn exec_ddl(&self, sql: &str, args: &[SqlValue]) -> Result<(), DbError>;

    /// Reads every table, view, routine and type in the current schema.
    async fn get_schema(&self) -> Result<SchemaSnapshot, DbError>;

    /// Reads one relation. `None` when it does not exist or is not of the
    /// same family as `kind` (table-like versus view-like).
    async fn read_table(&self, name: &str, kind: TableKind) -> Result<Option<Table>, DbError>;

    /// Runs a query and hands every row to `f`, stopping at the first
    /// error.
    async fn select_and_run_each<F>(&self, sql: &str, args: &[SqlValue], f: F) -> Result<(), DbError>
    where
        F: FnMut(Vec<SqlValue>) -> Result<(), DbError>;

    /// Like [`select_and_run_each`](Self::select_and_run_each), but every
    /// row must have exactly `width` columns.
    async fn select_and_scan_each<F>(
        &self,
        sql: &str,
        args: &[SqlValue],
        width: usize,
        mut f: F,
    ) -> Result<(), DbError>
    where
        F: FnMut(Vec<SqlValue>) -> Result<(), DbError>,
    {
        self.select_and_run_each(sql, args, |row| {
            if row.len() == width {
                f(row)
            } else {
                Err(DbError::new(format!(
                    "number of field descriptions must equal number of destinations, got {width} and {}",
                    row.len()
                )))
            }
        })
        .await
    }
}

/// True when a relation of kind `found` can stand in for `wanted`.
#[must_use]
pub const fn same_family(found: TableKind, wanted: TableKind) -> bool {
    found.is_view() == wanted.is_view()
}
