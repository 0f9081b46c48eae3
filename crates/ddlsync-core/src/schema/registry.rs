//! Shared in-memory mirror of the live schema.
//!
//! The migrator is the only writer. Query-serving callers read it
//! concurrently once migration is done, so every access goes through an
//! [`RwLock`]: readers get clones (or run under the read guard) and never
//! observe a table mid-replacement.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::catalog::{PgType, Routine, SchemaSnapshot};
use super::table::Table;

#[derive(Debug, Default)]
struct Catalog {
    tables: BTreeMap<String, Table>,
    routines: BTreeMap<String, Vec<Routine>>,
    types: BTreeMap<String, PgType>,
}

/// Thread-safe catalog of tables, routines and types.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    inner: RwLock<Catalog>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: SchemaSnapshot) -> Self {
        let registry = Self::new();
        registry.load(snapshot);
        registry
    }

    // A panicking writer only ever leaves whole tables behind, so the
    // data is still consistent after poisoning.
    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the whole catalog.
    pub fn load(&self, snapshot: SchemaSnapshot) {
        let mut catalog = self.write();
        catalog.tables = snapshot
            .tables
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        catalog.routines.clear();
        for routine in snapshot.routines {
            catalog
                .routines
                .entry(routine.name.clone())
                .or_default()
                .push(routine);
        }
        catalog.types = snapshot
            .types
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
    }

    /// A copy of the current catalog.
    #[must_use]
    pub fn snapshot(&self) -> SchemaSnapshot {
        let catalog = self.read();
        SchemaSnapshot {
            tables: catalog.tables.values().cloned().collect(),
            routines: catalog.routines.values().flatten().cloned().collect(),
            types: catalog.types.values().cloned().collect(),
        }
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<Table> {
        self.read().tables.get(name).cloned()
    }

    #[must_use]
    pub fn contains_table(&self, name: &str) -> bool {
        self.read().tables.contains_key(name)
    }

    /// Runs `f` against a table while holding the read lock.
    pub fn with_table<R>(&self, name: &str, f: impl FnOnce(&Table) -> R) -> Option<R> {
        self.read().tables.get(name).map(f)
    }

    /// Inserts or replaces a table.
    pub fn put_table(&self, table: Table) {
        self.write().tables.insert(table.name.clone(), table);
    }

    pub fn remove_table(&self, name: &str) -> Option<Table> {
        self.write().tables.remove(name)
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.read().tables.keys().cloned().collect()
    }

    #[must_use]
    pub fn pg_type(&self, name: &str) -> Option<PgType> {
        self.read().types.get(name).cloned()
    }

    pub fn put_type(&self, pg_type: PgType) {
        self.write().types.insert(pg_type.name.clone(), pg_type);
    }

    /// All known overloads of `name`.
    #[must_use]
    pub fn routines(&self, name: &str) -> Vec<Routine> {
        self.read().routines.get(name).cloned().unwrap_or_default()
    }

    /// Replaces the overload set of `name`.
    pub fn put_routines(&self, name: &str, routines: Vec<Routine>) {
        let mut catalog = self.write();
        if routines.is_empty() {
            catalog.routines.remove(name);
        } else {
            catalog.routines.insert(name.to_string(), routines);
        }
    }
}
