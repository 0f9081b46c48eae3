//! Statement dispatch.
//!
//! A file is split into statements and each statement is offered to the
//! handlers of [`Handler::PRECEDENCE`] in order. A handler either declines
//! (`Ok(false)`), consumes the statement (`Ok(true)`) or consumes it with an
//! error, which is logged against the file and does not stop the next
//! statement. The order matters: the DML handlers recognize their
//! statements by keyword, so they come after every DDL shape.

mod index;
mod objects;
mod state;
mod table;

pub use state::{ObjectKind, ParserState};

use ddlsync_core::classify::{DbError, ErrorKind};
use ddlsync_core::grammar::split_statements;
use ddlsync_core::schema::{SchemaRegistry, Table, TableKind};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::MigrateConfig;
use crate::connection::Connection;
use crate::error::{MigrateError, Result};

/// A statement handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Handler {
    UpdateTable,
    UpdateView,
    AddComment,
    UpdateIndex,
    SkipPartition,
    PerformsInsert,
    PerformsUpdate,
    PerformsCreateExtension,
    AlterTable,
    AlterMaterializedView,
    PerformsGrants,
    /// `CREATE TYPE`, offered only for files under `types/`.
    CreateType,
}

impl Handler {
    pub const PRECEDENCE: &'static [Self] = &[
        Self::UpdateTable,
        Self::UpdateView,
        Self::AddComment,
        Self::UpdateIndex,
        Self::SkipPartition,
        Self::PerformsInsert,
        Self::PerformsUpdate,
        Self::PerformsCreateExtension,
        Self::AlterTable,
        Self::AlterMaterializedView,
        Self::PerformsGrants,
    ];

    pub const TYPE_PRECEDENCE: &'static [Self] = &[
        Self::CreateType,
        Self::UpdateTable,
        Self::UpdateView,
        Self::AddComment,
        Self::UpdateIndex,
        Self::SkipPartition,
        Self::PerformsInsert,
        Self::PerformsUpdate,
        Self::PerformsCreateExtension,
        Self::AlterTable,
        Self::AlterMaterializedView,
        Self::PerformsGrants,
    ];
}

/// Applies DDL statements against a connection, keeping the registry in
/// step with what was changed.
pub struct Reconciler<'a, C> {
    conn: &'a C,
    registry: &'a SchemaRegistry,
    config: &'a MigrateConfig,
}

impl<'a, C: Connection> Reconciler<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C, registry: &'a SchemaRegistry, config: &'a MigrateConfig) -> Self {
        Self {
            conn,
            registry,
            config,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Dispatches every statement of `source`.
    pub async fn reconcile_source(&self, state: &mut ParserState, source: &str) {
        for fragment in split_statements(source) {
            state.line = fragment.line;
            self.dispatch(state, &fragment.text).await;
        }
    }

    /// Offers one statement to the handlers. Returns the handler that
    /// consumed it.
    pub async fn dispatch(&self, state: &mut ParserState, sql: &str) -> Option<Handler> {
        for &handler in state.handlers {
            match self.offer(handler, state, sql).await {
                Ok(false) => {}
                Ok(true) => return Some(handler),
                Err(err) => {
                    state.report(err);
                    return Some(handler);
                }
            }
        }
        state.report(MigrateError::UnknownSql(sql.to_string()));
        None
    }

    async fn offer(&self, handler: Handler, state: &mut ParserState, sql: &str) -> Result<bool> {
        match handler {
            Handler::UpdateTable => self.update_table(state, sql).await,
            Handler::UpdateView => self.update_view(state, sql).await,
            Handler::AddComment => self.add_comment(state, sql).await,
            Handler::UpdateIndex => self.update_index(state, sql).await,
            Handler::SkipPartition => self.skip_partition(state, sql).await,
            Handler::PerformsInsert => self.performs_insert(state, sql).await,
            Handler::PerformsUpdate => self.performs_update(state, sql).await,
            Handler::PerformsCreateExtension => self.performs_create_extension(state, sql).await,
            Handler::AlterTable => self.alter_table(state, sql).await,
            Handler::AlterMaterializedView => self.alter_materialized_view(state, sql).await,
            Handler::PerformsGrants => self.performs_grants(state, sql).await,
            Handler::CreateType => self.create_type(state, sql).await,
        }
    }

    async fn exec(&self, state: &mut ParserState, sql: &str) -> std::result::Result<(), DbError> {
        self.conn.exec_ddl(sql, &[]).await?;
        state.executed += 1;
        Ok(())
    }

    /// Executes `sql`, absorbing the failures a re-run or a forward
    /// reference explains.
    async fn run(&self, state: &mut ParserState, sql: &str) -> Result<()> {
        match self.exec(state, sql).await {
            Ok(()) => Ok(()),
            Err(err) => self.absorb(state, err),
        }
    }

    /// Decides whether a driver error stops the statement. Existing objects
    /// are fine; a missing relation or type other than the file's own
    /// object defers the file until it is created.
    fn absorb(&self, state: &mut ParserState, err: DbError) -> Result<()> {
        match err.kind() {
            ErrorKind::AlreadyExists => {
                debug!(file = %state.file.display(), line = state.line, error = %err, "Already exists");
                Ok(())
            }
            ErrorKind::RelationDoesNotExist(name) | ErrorKind::TypeDoesNotExist(name)
                if name != state.object =>
            {
                info!(file = %state.file.display(), waiting_for = %name, "Deferring file");
                state.defer(&name);
                Ok(())
            }
            ErrorKind::RelationDoesNotExist(name) if state.is_deferred() => {
                debug!(file = %state.file.display(), relation = %name, "Not created yet, deferred");
                Ok(())
            }
            _ => Err(err.into()),
        }
    }

    /// Re-reads a relation after changing it. Falls back to `fallback` when
    /// the connection cannot see it (dry run).
    async fn refresh(&self, name: &str, kind: TableKind, fallback: impl FnOnce() -> Table) -> Result<()> {
        let table = self.conn.read_table(name, kind).await?.unwrap_or_else(fallback);
        self.registry.put_table(table);
        Ok(())
    }

    /// Reloads the whole catalog. Needed after a `CASCADE` drop, which may
    /// take other relations with it.
    async fn reload(&self) -> Result<()> {
        self.registry.load(self.conn.get_schema().await?);
        Ok(())
    }
}
