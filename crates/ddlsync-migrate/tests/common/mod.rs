#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use ddlsync_core::builder::SqlValue;
use ddlsync_core::classify::DbError;
use ddlsync_core::grammar::{
    match_comment, match_create_index, match_create_table, match_create_type, match_create_view,
    match_materialized_view, match_partition_of, routine_headers, CommentTarget,
};
use ddlsync_core::schema::{
    Column, ColumnInfo, PgType, Routine, SchemaRegistry, SchemaSnapshot, Table, TableKind,
};
use ddlsync_migrate::config::MigrateConfig;
use ddlsync_migrate::connection::{same_family, Connection};
use ddlsync_migrate::reconciler::{ObjectKind, ParserState, Reconciler};

struct Failure {
    needle: String,
    error: DbError,
    remaining: Option<usize>,
}

#[derive(Default)]
struct MockState {
    tables: BTreeMap<String, Table>,
    types: BTreeMap<String, PgType>,
    routines: Vec<Routine>,
    statements: Vec<String>,
    failures: Vec<Failure>,
    rows: Vec<Vec<SqlValue>>,
}

/// An in-memory database that understands the statements the reconciler
/// issues and records every one of them.
#[derive(Default)]
pub struct MockConnection {
    state: Mutex<MockState>,
}

fn missing_relation(name: &str) -> DbError {
    DbError::with_code("42P01", format!("relation \"{name}\" does not exist"))
}

fn duplicate_relation(name: &str) -> DbError {
    DbError::with_code("42P07", format!("relation \"{name}\" already exists"))
}

/// The word following `marker` (`EXISTS`, `TABLE`, ...), without quotes
/// or a trailing argument list.
fn word_after(sql: &str, marker: &str) -> Option<String> {
    let mut words = sql.split_whitespace();
    words.find(|w| w.eq_ignore_ascii_case(marker))?;
    words
        .next()
        .map(|w| w.split('(').next().unwrap_or(w).trim_matches('"').to_string())
}

fn upper(sql: &str) -> String {
    sql.to_ascii_uppercase()
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: Table) -> Self {
        self.lock().tables.insert(table.name.clone(), table);
        self
    }

    pub fn with_type(self, pg_type: PgType) -> Self {
        self.lock().types.insert(pg_type.name.clone(), pg_type);
        self
    }

    pub fn with_routine(self, routine: Routine) -> Self {
        self.lock().routines.push(routine);
        self
    }

    pub fn with_rows(self, rows: Vec<Vec<SqlValue>>) -> Self {
        self.lock().rows = rows;
        self
    }

    /// Fails the next statement containing `needle`.
    pub fn fail_once(&self, needle: &str, error: DbError) {
        self.fail(needle, error, Some(1));
    }

    /// Fails every statement containing `needle`.
    pub fn fail_always(&self, needle: &str, error: DbError) {
        self.fail(needle, error, None);
    }

    fn fail(&self, needle: &str, error: DbError, remaining: Option<usize>) {
        self.lock().failures.push(Failure {
            needle: needle.to_string(),
            error,
            remaining,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    pub fn clear_statements(&self) {
        self.lock().statements.clear();
    }

    pub fn table(&self, name: &str) -> Option<Table> {
        self.lock().tables.get(name).cloned()
    }

    pub fn pg_type(&self, name: &str) -> Option<PgType> {
        self.lock().types.get(name).cloned()
    }

    pub fn routines(&self) -> Vec<Routine> {
        self.lock().routines.clone()
    }

    fn scripted_failure(state: &mut MockState, sql: &str) -> Option<DbError> {
        let failure = state
            .failures
            .iter_mut()
            .find(|f| sql.contains(&f.needle) && f.remaining != Some(0))?;
        if let Some(remaining) = failure.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(failure.error.clone())
    }

    fn apply(state: &mut MockState, sql: &str) -> Result<(), DbError> {
        let head = upper(sql);

        if let Some(create) = match_create_table(sql) {
            if state.tables.contains_key(&create.name) {
                return Err(duplicate_relation(&create.name));
            }
            for target in create.columns.iter().filter_map(|c| c.references.as_ref()) {
                if !state.tables.contains_key(target) {
                    return Err(missing_relation(target));
                }
            }
            state
                .tables
                .insert(create.name.clone(), Table::from_declaration(&create));
            return Ok(());
        }

        if let Some(partition) = match_partition_of(sql) {
            let Some(parent) = state.tables.get(&partition.parent) else {
                return Err(missing_relation(&partition.parent));
            };
            let table = Table::new(&partition.name, TableKind::Table).with_columns(parent.columns.clone());
            state.tables.insert(partition.name, table);
            return Ok(());
        }

        if let Some(view) = match_create_view(sql) {
            if state.tables.contains_key(&view.name) && !view.or_replace {
                return Err(duplicate_relation(&view.name));
            }
            state
                .tables
                .insert(view.name.clone(), Table::new(&view.name, TableKind::View));
            return Ok(());
        }

        if let Some(name) = match_materialized_view(sql) {
            if state.tables.contains_key(&name) {
                return Err(duplicate_relation(&name));
            }
            state
                .tables
                .insert(name.clone(), Table::new(&name, TableKind::MaterializedView));
            return Ok(());
        }

        if head.starts_with("DROP VIEW") || head.starts_with("DROP MATERIALIZED VIEW") {
            if let Some(name) = word_after(sql, "EXISTS") {
                state.tables.remove(&name);
            }
            return Ok(());
        }

        if head.starts_with("DROP INDEX") {
            if let Some(name) = word_after(sql, "EXISTS") {
                for table in state.tables.values_mut() {
                    table.indexes.retain(|i| i.name != name);
                }
            }
            return Ok(());
        }

        if head.contains("DROP CONSTRAINT") {
            if let Some(name) = word_after(sql, "EXISTS") {
                for table in state.tables.values_mut() {
                    table.indexes.retain(|i| i.name != name);
                }
            }
            return Ok(());
        }

        if let Some(index) = match_create_index(sql) {
            if let Some(fk) = &index.foreign {
                if !state.tables.contains_key(&fk.table) {
                    return Err(missing_relation(&fk.table));
                }
            }
            let Some(table) = state.tables.get_mut(&index.table) else {
                return Err(missing_relation(&index.table));
            };
            if table.find_index(&index.name).is_some() {
                return Err(duplicate_relation(&index.name));
            }
            table.indexes.push(index);
            return Ok(());
        }

        if let Some(comment) = match_comment(sql) {
            let Some(table) = state.tables.get_mut(comment.target.relation()) else {
                return Err(missing_relation(comment.target.relation()));
            };
            match &comment.target {
                CommentTarget::Column { column, .. } => {
                    if let (Some(slot), Some(text)) = (
                        table.columns.iter_mut().find(|c| c.name() == column),
                        &comment.text,
                    ) {
                        *slot = slot.clone().with_comment(text.clone());
                    }
                }
                _ => table.comment.clone_from(&comment.text),
            }
            return Ok(());
        }

        if let Some(declared) = match_create_type(sql) {
            if state.types.contains_key(&declared.name) {
                return Err(DbError::with_code(
                    "42710",
                    format!("type \"{}\" already exists", declared.name),
                ));
            }
            state.types.insert(
                declared.name.clone(),
                PgType {
                    name: declared.name,
                    kind: declared.kind,
                    labels: declared.labels,
                },
            );
            return Ok(());
        }

        if head.starts_with("ALTER TYPE") && head.contains("ADD VALUE") {
            let name = word_after(sql, "TYPE").unwrap_or_default();
            let label = sql
                .split('\'')
                .nth(1)
                .unwrap_or_default()
                .to_string();
            if let Some(pg_type) = state.types.get_mut(&name) {
                if !pg_type.labels.contains(&label) {
                    pg_type.labels.push(label);
                }
            }
            return Ok(());
        }

        if head.starts_with("ALTER TABLE") {
            return Self::alter_table(state, sql);
        }

        if head.starts_with("DROP FUNCTION") || head.starts_with("DROP PROCEDURE") {
            let name = word_after(sql, "EXISTS").unwrap_or_default();
            let arguments = sql
                .split_once('(')
                .and_then(|(_, rest)| rest.rsplit_once(')'))
                .map(|(args, _)| args.to_string())
                .unwrap_or_default();
            state
                .routines
                .retain(|r| !(r.name == name && r.arguments == arguments));
            return Ok(());
        }

        let headers = routine_headers(sql);
        if !headers.is_empty() {
            for header in headers {
                state
                    .routines
                    .retain(|r| !(r.name == header.name && r.arguments == header.arguments));
                state.routines.push(header);
            }
            return Ok(());
        }

        Ok(())
    }

    fn alter_table(state: &mut MockState, sql: &str) -> Result<(), DbError> {
        let name = word_after(sql, "TABLE").unwrap_or_default();
        let Some(table) = state.tables.get_mut(&name) else {
            return Err(missing_relation(&name));
        };
        for definition in sql.split("ADD COLUMN ").skip(1) {
            let definition = definition.trim().trim_end_matches(',');
            let create = format!("CREATE TABLE {name} ({definition})");
            if let Some(decl) = match_create_table(&create).and_then(|c| c.columns.into_iter().next()) {
                table.columns.push(Column::from_decl(&decl));
            }
        }
        for clause in sql.split("ALTER COLUMN ").skip(1) {
            let clause = clause.trim().trim_end_matches(',');
            let Some((column, action)) = clause.split_once(' ') else {
                continue;
            };
            let Some(slot) = table
                .columns
                .iter_mut()
                .find(|c| c.name() == column)
            else {
                continue;
            };
            let action = upper(action);
            if action.starts_with("SET NOT NULL") {
                *slot = slot.clone().nullable(false);
            } else if action.starts_with("DROP NOT NULL") {
                *slot = slot.clone().nullable(true);
            } else if action.starts_with("SET DEFAULT") {
                let default = clause.split_once("SET DEFAULT ").map_or("", |(_, d)| d);
                *slot = slot.clone().with_default(default.trim());
            }
        }
        Ok(())
    }
}

impl Connection for MockConnection {
    async fn exec_ddl(&self, sql: &str, _args: &[SqlValue]) -> Result<(), DbError> {
        let mut state = self.lock();
        state.statements.push(sql.to_string());
        if let Some(err) = Self::scripted_failure(&mut state, sql) {
            return Err(err);
        }
        Self::apply(&mut state, sql)
    }

    async fn get_schema(&self) -> Result<SchemaSnapshot, DbError> {
        let state = self.lock();
        Ok(SchemaSnapshot {
            tables: state.tables.values().cloned().collect(),
            routines: state.routines.clone(),
            types: state.types.values().cloned().collect(),
        })
    }

    async fn read_table(&self, name: &str, kind: TableKind) -> Result<Option<Table>, DbError> {
        Ok(self
            .lock()
            .tables
            .get(name)
            .filter(|t| same_family(t.kind, kind))
            .cloned())
    }

    async fn select_and_run_each<F>(&self, _sql: &str, _args: &[SqlValue], mut f: F) -> Result<(), DbError>
    where
        F: FnMut(Vec<SqlValue>) -> Result<(), DbError>,
    {
        let rows = self.lock().rows.clone();
        for row in rows {
            f(row)?;
        }
        Ok(())
    }
}

/// A registry loaded from the mock's current tables.
pub async fn registry(conn: &MockConnection) -> SchemaRegistry {
    SchemaRegistry::from_snapshot(conn.get_schema().await.unwrap())
}

/// Dispatches `source` as if it were the file `file` of kind `kind`.
pub async fn reconcile(
    conn: &MockConnection,
    registry: &SchemaRegistry,
    config: &MigrateConfig,
    file: &str,
    kind: ObjectKind,
    source: &str,
) -> ParserState {
    let mut state = ParserState::new(file, kind);
    Reconciler::new(conn, registry, config)
        .reconcile_source(&mut state, source)
        .await;
    state
}

/// Statements issued that change the schema.
pub fn ddl_statements(conn: &MockConnection) -> Vec<String> {
    conn.statements()
        .into_iter()
        .filter(|s| {
            let head = upper(s);
            ["CREATE", "ALTER", "DROP", "COMMENT"]
                .iter()
                .any(|verb| head.starts_with(verb))
        })
        .collect()
}

/// Writes `files` (relative path, contents) under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, contents) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("Failed to create {}: {e}", parent.display()));
        }
        std::fs::write(&path, contents)
            .unwrap_or_else(|e| panic!("Failed to write {}: {e}", path.display()));
    }
}
