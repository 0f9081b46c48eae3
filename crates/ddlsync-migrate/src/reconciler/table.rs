//! Tables, views, partitions and comments.

use ddlsync_core::classify::ErrorKind;
use ddlsync_core::grammar::{
    match_comment, match_create_table, match_create_view, match_partition_of, ColumnDecl,
    CommentTarget, CreateTable,
};
use ddlsync_core::schema::{
    add_columns_sql, alter_clauses, alter_table_sql, backfill_sql, diff_column, quote_ident,
    ColumnInfo, Table, TableInfo, TableKind,
};
use tracing::{debug, info, warn};

use super::{ParserState, Reconciler};
use crate::connection::Connection;
use crate::error::{MigrateError, Result};

fn check_name(state: &ParserState, found: &str) -> Result<()> {
    if found == state.object {
        Ok(())
    } else {
        Err(MigrateError::NameMismatch {
            expected: state.object.clone(),
            found: found.to_string(),
        })
    }
}

fn check_family(table: &Table, wanted: TableKind) -> Result<()> {
    if table.kind.is_view() == wanted.is_view() {
        Ok(())
    } else {
        Err(MigrateError::WrongType {
            name: table.name.clone(),
            expected: wanted.as_str().to_string(),
            found: table.kind.as_str().to_string(),
        })
    }
}

impl<C: Connection> Reconciler<'_, C> {
    pub(super) async fn update_table(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        let Some(create) = match_create_table(sql) else {
            return Ok(false);
        };
        check_name(state, &create.name)?;

        match self.registry.table(&create.name) {
            Some(live) => {
                check_family(&live, TableKind::Table)?;
                self.reconcile_columns(state, &create, &live).await?;
            }
            None => {
                if let Err(err) = self.exec(state, sql).await {
                    let exists = err.kind() == ErrorKind::AlreadyExists;
                    self.absorb(state, err)?;
                    if !exists {
                        return Ok(true);
                    }
                }
                info!(table = %create.name, "Created table");
                self.refresh(&create.name, TableKind::Table, || Table::from_declaration(&create))
                    .await?;
                state.mark_created(&create.name);
            }
        }
        Ok(true)
    }

    async fn reconcile_columns(&self, state: &mut ParserState, create: &CreateTable, live: &Table) -> Result<()> {
        let table = create.name.as_str();
        let missing: Vec<&ColumnDecl> = create
            .columns
            .iter()
            .filter(|decl| live.find_column(&decl.name).is_none())
            .collect();
        let mut changed = false;
        if !missing.is_empty() {
            info!(table, columns = missing.len(), "Adding columns");
            if let Err(err) = self.run(state, &add_columns_sql(table, &missing)).await {
                state.report(err);
            }
            changed = true;
        }

        let mut drift: Vec<(&ColumnDecl, Vec<String>)> = Vec::new();
        for decl in &create.columns {
            let Some(column) = live.find_column(&decl.name) else {
                continue;
            };
            let mut flags = diff_column(column, decl);
            if column.is_primary_key() {
                flags.retain(|flag| flag.is_type_change());
            }
            if flags.is_empty() {
                continue;
            }
            info!(table, column = %decl.name, flags = ?flags, "Column drift");
            drift.push((decl, alter_clauses(column, decl, &flags)));
        }

        if !drift.is_empty() {
            changed = true;
            let clauses: Vec<String> = drift.iter().flat_map(|(_, c)| c.iter().cloned()).collect();
            if let Err(err) = self.exec(state, &alter_table_sql(table, &clauses)).await {
                debug!(table, error = %err, "Batched ALTER failed, retrying per column");
                for (decl, clauses) in &drift {
                    if let Err(err) = self.alter_column(state, table, decl, clauses).await {
                        warn!(table, column = %decl.name, "Abandoning column");
                        state.report(err);
                    }
                }
            }
        }

        if changed {
            self.refresh(table, TableKind::Table, || live.clone()).await?;
        }
        Ok(())
    }

    /// Applies one column's clauses. NULLs blocking the change are
    /// replaced by the declared default and the change is tried once more.
    async fn alter_column(
        &self,
        state: &mut ParserState,
        table: &str,
        decl: &ColumnDecl,
        clauses: &[String],
    ) -> Result<()> {
        let sql = alter_table_sql(table, clauses);
        let Err(err) = self.exec(state, &sql).await else {
            return Ok(());
        };
        if err.kind() != ErrorKind::NullConstraintViolation {
            return self.absorb(state, err);
        }
        let Some(backfill) = backfill_sql(table, decl) else {
            return Err(err.into());
        };
        info!(table, column = %decl.name, "Back-filling NULLs with the declared default");
        if let Err(err) = self.exec(state, &backfill).await {
            // The retry below reports the failure that matters.
            warn!(table, column = %decl.name, error = %err, "Back-fill failed");
        }
        match self.exec(state, &sql).await {
            Ok(()) => Ok(()),
            Err(err) => self.absorb(state, err),
        }
    }

    pub(super) async fn update_view(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        let Some(view) = match_create_view(sql) else {
            return Ok(false);
        };
        check_name(state, &view.name)?;

        if let Some(live) = self.registry.table(&view.name) {
            check_family(&live, TableKind::View)?;
            if !view.or_replace {
                debug!(view = %view.name, "View exists, skipping");
                return Ok(true);
            }
        }

        match self.exec(state, sql).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NeedsReplace => {
                info!(view = %view.name, error = %err, "Recreating view");
                let drop = format!("DROP VIEW IF EXISTS {} CASCADE", quote_ident(&view.name));
                self.exec(state, &drop).await?;
                self.reload().await?;
                self.exec(state, sql).await?;
            }
            Err(err) => {
                let exists = err.kind() == ErrorKind::AlreadyExists;
                self.absorb(state, err)?;
                if !exists {
                    return Ok(true);
                }
            }
        }
        self.refresh(&view.name, TableKind::View, || Table::new(&view.name, TableKind::View))
            .await?;
        state.mark_created(&view.name);
        Ok(true)
    }

    pub(super) async fn add_comment(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        let Some(comment) = match_comment(sql) else {
            return Ok(false);
        };
        let relation = comment.target.relation();
        check_name(state, relation)?;
        let Some(mut table) = self.registry.table(relation) else {
            if state.is_deferred() {
                debug!(relation, "Table not created yet, deferred");
                return Ok(true);
            }
            return Err(MigrateError::NotFoundTable(relation.to_string()));
        };

        let live = match &comment.target {
            CommentTarget::Table(_) | CommentTarget::View(_) => table.comment.clone(),
            CommentTarget::Column { table: owner, column } => table
                .find_column(column)
                .ok_or_else(|| MigrateError::NotFoundColumn {
                    table: owner.clone(),
                    column: column.clone(),
                })?
                .comment()
                .map(str::to_string),
        };
        if live == comment.text {
            debug!(relation, "Comment unchanged");
            return Ok(true);
        }

        self.run(state, sql).await?;
        let kind = table.kind;
        if let CommentTarget::Column { column, .. } = &comment.target {
            if let (Some(slot), Some(text)) = (
                table.columns.iter_mut().find(|c| c.name() == column),
                &comment.text,
            ) {
                *slot = slot.clone().with_comment(text.clone());
            }
        } else {
            table.comment.clone_from(&comment.text);
        }
        self.refresh(relation, kind, || table).await?;
        Ok(true)
    }

    /// Partitions are created once; an existing partition is never
    /// re-attached.
    pub(super) async fn skip_partition(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        let Some(partition) = match_partition_of(sql) else {
            return Ok(false);
        };
        if self.registry.contains_table(&partition.name) {
            debug!(partition = %partition.name, parent = %partition.parent, "Partition exists, skipping");
            return Ok(true);
        }
        if let Err(err) = self.exec(state, sql).await {
            let exists = err.kind() == ErrorKind::AlreadyExists;
            self.absorb(state, err)?;
            if !exists {
                return Ok(true);
            }
        }
        let parent = self.registry.table(&partition.parent);
        self.refresh(&partition.name, TableKind::Table, || {
            let columns = parent.map(|p| p.columns).unwrap_or_default();
            Table::new(&partition.name, TableKind::Table).with_columns(columns)
        })
        .await?;
        state.mark_created(&partition.name);
        Ok(true)
    }
}
