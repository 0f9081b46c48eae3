//! Declarative schema reconciliation for PostgreSQL.
//!
//! `ddlsync-migrate` applies a tree of DDL files to a live database and
//! only issues the statements needed to close the gap:
//! - New tables, views, indexes and types are created
//! - Existing tables gain missing columns and have drifted columns altered
//! - Changed indexes are dropped and recreated
//! - Re-running the same tree is a no-op
//!
//! # Source layout
//!
//! ```text
//! db/
//!   types/mood.ddl
//!   table/users.ddl
//!   table/orders.ddl
//!   view/active_users.ddl
//!   func/touch_updated_at.ddl
//! ```
//!
//! Each file is named after the object it declares. Phases run in the
//! order above; see [`migrator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ddlsync_migrate::prelude::*;
//!
//! let conn = PgConnection::connect("postgres://localhost/app").await?;
//! let migrator = Migrator::new(conn, MigrateConfig::new("db"));
//! let report = migrator.run().await?;
//! assert!(!report.has_errors());
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Apply the tree under ./db
//! ddlsync --database-url postgres://localhost/app migrate --src db
//!
//! # Print the statements instead of running them
//! ddlsync migrate --src db --dry-run
//!
//! # Dump the live schema
//! ddlsync show-schema --json
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod migrator;
pub mod postgres;
pub mod reconciler;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::MigrateConfig;
    pub use crate::connection::Connection;
    pub use crate::error::{MigrateError, Result};
    pub use crate::migrator::{MigrationReport, Migrator};
    pub use crate::postgres::PgConnection;
    pub use crate::reconciler::{Handler, ObjectKind, ParserState, Reconciler};
}
