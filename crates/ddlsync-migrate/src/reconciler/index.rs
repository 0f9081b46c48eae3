use ddlsync_core::grammar::match_create_index;
use ddlsync_core::schema::{quote_ident, Index, Table, TableKind};
use tracing::{debug, info, warn};

use super::{ParserState, Reconciler};
use crate::connection::Connection;
use crate::error::Result;

/// `DROP CONSTRAINT` for constraint-backed indexes, `DROP INDEX` otherwise.
fn drop_sql(declared: &Index, live: &Index) -> String {
    if declared.constraint || live.constraint {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
            quote_ident(&live.table),
            quote_ident(&live.name)
        )
    } else {
        format!("DROP INDEX IF EXISTS {}", quote_ident(&live.name))
    }
}

impl<C: Connection> Reconciler<'_, C> {
    pub(super) async fn update_index(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        let Some(index) = match_create_index(sql) else {
            return Ok(false);
        };
        let live = self
            .registry
            .with_table(&index.table, |t| (t.kind, t.find_index(&index.name).cloned()));

        let Some((kind, live_index)) = live else {
            // Unknown table: the driver decides, and a missing table defers
            // the file.
            self.run(state, sql).await?;
            return Ok(true);
        };

        match live_index {
            None => {
                info!(index = %index.name, table = %index.table, "Creating index");
                self.run(state, sql).await?;
            }
            Some(live_index) => {
                let comparison = index.compare(&live_index);
                if comparison.benign_expression {
                    warn!(
                        index = %index.name,
                        declared = ?index.expr,
                        live = ?live_index.expr,
                        "Index expressions differ only in parentheses"
                    );
                }
                if !comparison.is_changed() {
                    debug!(index = %index.name, "Index unchanged");
                    return Ok(true);
                }
                info!(index = %index.name, changes = ?comparison.changes, "Recreating index");
                self.exec(state, &drop_sql(&index, &live_index)).await?;
                self.run(state, sql).await?;
            }
        }

        let table = index.table.clone();
        self.refresh(&table, kind, || {
            let mut fallback = self
                .registry
                .table(&table)
                .unwrap_or_else(|| Table::new(&table, TableKind::Table));
            fallback.indexes.retain(|i| i.name != index.name);
            fallback.indexes.push(index);
            fallback
        })
        .await?;
        Ok(true)
    }
}
