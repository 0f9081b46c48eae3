//! Per-file reconciliation state.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::error;

use super::Handler;
use crate::error::MigrateError;

/// What kind of object a DDL file declares. Follows the directory the file
/// was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    Type,
    Table,
    View,
    Function,
}

impl ObjectKind {
    /// Directory holding files of this kind, relative to the source root.
    #[must_use]
    pub const fn dir(self) -> &'static str {
        match self {
            Self::Type => "types",
            Self::Table => "table",
            Self::View => "view",
            Self::Function => "func",
        }
    }

    /// Handlers offered each statement, in precedence order.
    #[must_use]
    pub const fn handlers(self) -> &'static [Handler] {
        match self {
            Self::Type => Handler::TYPE_PRECEDENCE,
            _ => Handler::PRECEDENCE,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// State of one file while its statements are dispatched.
#[derive(Debug)]
pub struct ParserState {
    pub file: PathBuf,
    /// Object the file is named after.
    pub object: String,
    pub kind: ObjectKind,
    /// Line of the statement being handled.
    pub line: usize,
    pub handlers: &'static [Handler],
    pub last_error: Option<MigrateError>,
    /// Relations and types this file created.
    pub created: Vec<String>,
    /// Relations this file is waiting for.
    pub missing: Vec<String>,
    pub executed: usize,
    pub errors: usize,
}

impl ParserState {
    /// State for `file`; the object name is the file stem.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, kind: ObjectKind) -> Self {
        let file = file.into();
        let object = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file,
            object,
            kind,
            line: 0,
            handlers: kind.handlers(),
            last_error: None,
            created: Vec::new(),
            missing: Vec::new(),
            executed: 0,
            errors: 0,
        }
    }

    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Logs a statement failure and keeps it as the file's last error.
    pub fn report(&mut self, err: MigrateError) {
        error!(file = %self.file.display(), line = self.line, error = %err, "Statement failed");
        self.errors += 1;
        self.last_error = Some(err);
    }

    pub(crate) fn defer(&mut self, relation: &str) {
        if !self.missing.iter().any(|m| m == relation) {
            self.missing.push(relation.to_string());
        }
    }

    pub(crate) fn mark_created(&mut self, name: &str) {
        if !self.created.iter().any(|c| c == name) {
            self.created.push(name.to_string());
        }
    }

    /// True once a statement was deferred on a missing relation.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        !self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_name_is_file_stem() {
        let state = ParserState::new("db/table/users.ddl", ObjectKind::Table);
        assert_eq!(state.object, "users");
        assert_eq!(state.handlers, Handler::PRECEDENCE);
        assert_eq!(ParserState::new("db/types/mood.ddl", ObjectKind::Type).handlers[0], Handler::CreateType);
    }

    #[test]
    fn report_keeps_last_error() {
        let mut state = ParserState::new("users.ddl", ObjectKind::Table);
        state.report(MigrateError::UnknownSql("VACUUM".into()));
        state.report(MigrateError::NotFoundTable("ghosts".into()));
        assert_eq!(state.errors, 2);
        assert!(matches!(state.last_error, Some(MigrateError::NotFoundTable(_))));

        state.defer("orders");
        state.defer("orders");
        assert_eq!(state.missing, vec!["orders"]);
    }
}
