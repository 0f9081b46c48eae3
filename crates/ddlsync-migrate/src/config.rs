//! Run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options for one reconciliation run. Built by the CLI and passed down
/// explicitly; nothing reads configuration from globals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Root directory holding `types/`, `table/`, `view/` and `func/`.
    pub src: PathBuf,
    /// Drop materialized views before re-running their `CREATE`.
    #[serde(default)]
    pub recreate_materialized_views: bool,
    /// Print statements instead of executing them.
    #[serde(default)]
    pub dry_run: bool,
}

impl MigrateConfig {
    #[must_use]
    pub fn new(src: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn recreate_materialized_views(mut self, enabled: bool) -> Self {
        self.recreate_materialized_views = enabled;
        self
    }

    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}
