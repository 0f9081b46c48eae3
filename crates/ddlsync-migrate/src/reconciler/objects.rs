//! Statements run mostly verbatim, plus types and routines.

use ddlsync_core::classify::ErrorKind;
use ddlsync_core::grammar::{
    contains_words, find_top_level_word, match_create_type, match_materialized_view,
    routine_headers, starts_with_words,
};
use ddlsync_core::schema::{quote_ident, PgType, PgTypeKind, Routine, Table, TableKind};
use tracing::{debug, info};

use super::{ParserState, Reconciler};
use crate::connection::Connection;
use crate::error::{MigrateError, Result};

/// DML statements may open with a `WITH` clause.
fn is_dml(sql: &str, verb: &str) -> bool {
    starts_with_words(sql, &[verb]) || (starts_with_words(sql, &["with"]) && contains_words(sql, &[verb]))
}

/// Adds `ON CONFLICT DO NOTHING` unless the insert handles conflicts. The
/// clause goes before a top-level `RETURNING`.
fn idempotent_insert(sql: &str) -> String {
    if contains_words(sql, &["on", "conflict"]) {
        return sql.to_string();
    }
    match find_top_level_word(sql, "returning") {
        Some(at) => format!(
            "{} ON CONFLICT DO NOTHING {}",
            sql[..at].trim_end(),
            sql[at..].trim_end()
        ),
        None => format!("{} ON CONFLICT DO NOTHING", sql.trim_end()),
    }
}

fn add_value_sql(type_name: &str, label: &str) -> String {
    format!(
        "ALTER TYPE {} ADD VALUE IF NOT EXISTS '{}'",
        quote_ident(type_name),
        label.replace('\'', "''")
    )
}

impl<C: Connection> Reconciler<'_, C> {
    pub(super) async fn performs_insert(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        if !is_dml(sql, "insert") {
            return Ok(false);
        }
        self.run(state, &idempotent_insert(sql)).await?;
        Ok(true)
    }

    pub(super) async fn performs_update(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        if !is_dml(sql, "update") {
            return Ok(false);
        }
        self.run(state, sql).await?;
        Ok(true)
    }

    pub(super) async fn performs_create_extension(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        if !starts_with_words(sql, &["create", "extension"]) {
            return Ok(false);
        }
        self.run(state, sql).await?;
        Ok(true)
    }

    pub(super) async fn alter_table(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        if !starts_with_words(sql, &["alter", "table"]) {
            return Ok(false);
        }
        self.run(state, sql).await?;
        Ok(true)
    }

    /// `CREATE MATERIALIZED VIEW`, dropped first when recreation is
    /// configured, and `ALTER|REFRESH MATERIALIZED VIEW`.
    pub(super) async fn alter_materialized_view(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        let Some(name) = match_materialized_view(sql) else {
            let other = starts_with_words(sql, &["alter", "materialized", "view"])
                || starts_with_words(sql, &["refresh", "materialized", "view"]);
            if other {
                self.run(state, sql).await?;
            }
            return Ok(other);
        };

        let exists = self.registry.contains_table(&name);
        if exists && !self.config.recreate_materialized_views {
            debug!(view = %name, "Materialized view exists, skipping");
            return Ok(true);
        }
        if exists {
            info!(view = %name, "Recreating materialized view");
            let drop = format!("DROP MATERIALIZED VIEW IF EXISTS {} CASCADE", quote_ident(&name));
            self.exec(state, &drop).await?;
            self.reload().await?;
        }
        if let Err(err) = self.exec(state, sql).await {
            let already = err.kind() == ErrorKind::AlreadyExists;
            self.absorb(state, err)?;
            if !already {
                return Ok(true);
            }
        }
        self.refresh(&name, TableKind::MaterializedView, || {
            Table::new(&name, TableKind::MaterializedView)
        })
        .await?;
        state.mark_created(&name);
        Ok(true)
    }

    pub(super) async fn performs_grants(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        if !starts_with_words(sql, &["grant"]) && !starts_with_words(sql, &["revoke"]) {
            return Ok(false);
        }
        self.run(state, sql).await?;
        Ok(true)
    }

    /// New types are created; existing enums only gain missing labels.
    pub(super) async fn create_type(&self, state: &mut ParserState, sql: &str) -> Result<bool> {
        let Some(declared) = match_create_type(sql) else {
            return Ok(false);
        };

        let Some(mut live) = self.registry.pg_type(&declared.name) else {
            if let Err(err) = self.exec(state, sql).await {
                let exists = err.kind() == ErrorKind::AlreadyExists;
                self.absorb(state, err)?;
                if !exists {
                    return Ok(true);
                }
            }
            info!(type_name = %declared.name, "Created type");
            self.registry.put_type(PgType {
                name: declared.name.clone(),
                kind: declared.kind,
                labels: declared.labels,
            });
            state.mark_created(&declared.name);
            return Ok(true);
        };

        if live.kind != PgTypeKind::Enum || declared.kind != PgTypeKind::Enum {
            debug!(type_name = %declared.name, "Type exists, skipping");
            return Ok(true);
        }
        for label in &declared.labels {
            if live.labels.contains(label) {
                continue;
            }
            info!(type_name = %declared.name, label = %label, "Adding enum label");
            self.run(state, &add_value_sql(&declared.name, label)).await?;
            live.labels.push(label.clone());
        }
        self.registry.put_type(live);
        Ok(true)
    }

    /// Runs a function file as one statement. When a signature change
    /// blocks `CREATE OR REPLACE`, every routine the file declares is
    /// dropped and the file runs again.
    pub async fn apply_routines(&self, state: &mut ParserState, source: &str) -> Result<()> {
        state.line = 1;
        let headers = routine_headers(source);
        match self.exec(state, source).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NeedsReplace => {
                if headers.is_empty() {
                    return Err(MigrateError::NotFoundRoutine(state.file.display().to_string()));
                }
                info!(file = %state.file.display(), error = %err, "Dropping routines before redefining");
                for routine in &headers {
                    self.exec(state, &routine.drop_sql()).await?;
                }
                self.exec(state, source).await?;
            }
            Err(err) => return self.absorb(state, err),
        }

        for header in headers {
            let mut overloads: Vec<Routine> = self
                .registry
                .routines(&header.name)
                .into_iter()
                .filter(|r| r.arguments != header.arguments)
                .collect();
            let name = header.name.clone();
            overloads.push(header);
            self.registry.put_routines(&name, overloads);
        }
        Ok(())
    }
}
