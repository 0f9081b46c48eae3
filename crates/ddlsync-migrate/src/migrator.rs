//! Phase-ordered migration of a DDL source tree.
//!
//! Files are applied in four phases: `types/`, `table/`, `view/` and
//! `func/`. Within a phase they run in lexicographic order. A file that
//! fails on a relation defined later is parked in a [`PendingQueue`] and
//! replayed as soon as that relation is created.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use ddlsync_core::schema::SchemaRegistry;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MigrateConfig;
use crate::connection::Connection;
use crate::error::{MigrateError, Result};
use crate::reconciler::{ObjectKind, ParserState, Reconciler};

/// Phases in application order.
pub const PHASES: [ObjectKind; 4] = [
    ObjectKind::Type,
    ObjectKind::Table,
    ObjectKind::View,
    ObjectKind::Function,
];

/// Files waiting for a relation, keyed by the relation's name.
#[derive(Debug, Default)]
pub struct PendingQueue {
    waiting: BTreeMap<String, Vec<(PathBuf, ObjectKind)>>,
}

impl PendingQueue {
    pub fn defer(&mut self, relation: &str, file: PathBuf, kind: ObjectKind) {
        let files = self.waiting.entry(relation.to_string()).or_default();
        if !files.iter().any(|(f, _)| *f == file) {
            files.push((file, kind));
        }
    }

    /// Takes the files waiting for `relation`.
    pub fn release(&mut self, relation: &str) -> Vec<(PathBuf, ObjectKind)> {
        self.waiting.remove(relation).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Relation names still awaited, with their files.
    #[must_use]
    pub fn unresolved(&self) -> BTreeMap<String, Vec<PathBuf>> {
        self.waiting
            .iter()
            .map(|(name, files)| (name.clone(), files.iter().map(|(f, _)| f.clone()).collect()))
            .collect()
    }
}

/// A file whose last statement error is kept for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: PathBuf,
    pub message: String,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Files applied, replays included.
    pub files: usize,
    pub executed: usize,
    pub errors: usize,
    pub failures: Vec<FileFailure>,
    /// Forward references nothing in the run created.
    pub unresolved: BTreeMap<String, Vec<PathBuf>>,
}

impl MigrationReport {
    fn record(&mut self, state: &ParserState) {
        self.files += 1;
        self.executed += state.executed;
        self.errors += state.errors;
        if let Some(err) = &state.last_error {
            self.failures.push(FileFailure {
                file: state.file.clone(),
                message: err.to_string(),
            });
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors > 0 || !self.unresolved.is_empty()
    }
}

/// `*.ddl` files directly under `dir`, sorted. A missing directory has no
/// files.
pub async fn ddl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "No such directory");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(MigrateError::ReadFile {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && path.extension().is_some_and(|ext| ext == "ddl") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Applies a DDL source tree to a database.
pub struct Migrator<C> {
    conn: C,
    registry: SchemaRegistry,
    config: MigrateConfig,
}

impl<C: Connection> Migrator<C> {
    #[must_use]
    pub fn new(conn: C, config: MigrateConfig) -> Self {
        Self {
            conn,
            registry: SchemaRegistry::new(),
            config,
        }
    }

    /// The schema as of the last run.
    #[must_use]
    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn connection(&self) -> &C {
        &self.conn
    }

    #[must_use]
    pub const fn config(&self) -> &MigrateConfig {
        &self.config
    }

    /// Loads the live schema, then applies every phase.
    pub async fn run(&self) -> Result<MigrationReport> {
        self.registry.load(self.conn.get_schema().await?);
        info!(
            src = %self.config.src.display(),
            tables = self.registry.table_names().len(),
            dry_run = self.config.dry_run,
            "Loaded live schema"
        );

        let reconciler = Reconciler::new(&self.conn, &self.registry, &self.config);
        let mut pending = PendingQueue::default();
        let mut report = MigrationReport::default();

        for phase in PHASES {
            let dir = self.config.src.join(phase.dir());
            let mut queue: VecDeque<(PathBuf, ObjectKind)> =
                ddl_files(&dir).await?.into_iter().map(|f| (f, phase)).collect();
            info!(phase = %phase, files = queue.len(), "Starting phase");

            while let Some((file, kind)) = queue.pop_front() {
                let state = self.apply_file(&reconciler, &file, kind).await;
                report.record(&state);
                if let Some(relation) = state.missing.first() {
                    pending.defer(relation, file, kind);
                }
                for name in &state.created {
                    let released = pending.release(name);
                    if !released.is_empty() {
                        info!(relation = %name, files = released.len(), "Replaying deferred files");
                    }
                    queue.extend(released);
                }
            }
        }

        report.unresolved = pending.unresolved();
        for (relation, files) in &report.unresolved {
            warn!(relation = %relation, files = files.len(), "Relation never created");
        }
        info!(
            files = report.files,
            executed = report.executed,
            errors = report.errors,
            "Migration finished"
        );
        Ok(report)
    }

    /// Applies one file and returns its final state.
    pub async fn apply_file(&self, reconciler: &Reconciler<'_, C>, file: &Path, kind: ObjectKind) -> ParserState {
        let mut state = ParserState::new(file, kind);
        let source = match tokio::fs::read_to_string(file).await {
            Ok(source) => source,
            Err(source) => {
                state.report(MigrateError::ReadFile {
                    path: file.to_path_buf(),
                    source,
                });
                return state;
            }
        };

        debug!(file = %file.display(), kind = %kind, "Applying file");
        if kind == ObjectKind::Function {
            if let Err(err) = reconciler.apply_routines(&mut state, &source).await {
                state.report(err);
            }
        } else {
            reconciler.reconcile_source(&mut state, &source).await;
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_queue_releases_once() {
        let mut pending = PendingQueue::default();
        pending.defer("orders", PathBuf::from("table/items.ddl"), ObjectKind::Table);
        pending.defer("orders", PathBuf::from("table/items.ddl"), ObjectKind::Table);
        pending.defer("orders", PathBuf::from("view/totals.ddl"), ObjectKind::View);

        assert_eq!(pending.unresolved()["orders"].len(), 2);
        assert_eq!(pending.release("orders").len(), 2);
        assert!(pending.release("orders").is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn unresolved_references_are_errors() {
        let mut report = MigrationReport::default();
        assert!(!report.has_errors());
        report
            .unresolved
            .insert("orders".into(), vec![PathBuf::from("table/items.ddl")]);
        assert!(report.has_errors());
    }
}
