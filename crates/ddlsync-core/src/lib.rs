//! # ddlsync-core
//!
//! The I/O-free half of ddlsync: everything needed to reconcile a
//! PostgreSQL schema against declarative DDL files, short of talking to the
//! database.
//!
//! This crate provides:
//! - A PostgreSQL-aware lexer and statement matchers for the DDL subset
//!   the reconciler understands
//! - The schema model (tables, columns, indexes, routines, types) and the
//!   lock-guarded registry that mirrors the live catalog
//! - Column and index diffing, and the ALTER statements that fix drift
//! - Classification of driver errors into the conditions the reconciler
//!   reacts to
//! - A parameterized SQL builder over the schema model
//!
//! ## Matching and diffing
//!
//! ```rust
//! use ddlsync_core::grammar::match_create_table;
//! use ddlsync_core::schema::{alter_clauses, diff_column, Column, FlagColumn};
//!
//! let create = match_create_table("CREATE TABLE users (email varchar(120) NOT NULL)").unwrap();
//! let declared = &create.columns[0];
//! let live = Column::new("email", "varchar").with_max_length(64);
//!
//! let flags = diff_column(&live, declared);
//! assert!(flags.contains(&FlagColumn::ChangeLength));
//! assert!(flags.contains(&FlagColumn::MustNotNull));
//! assert!(!alter_clauses(&live, declared, &flags).is_empty());
//! ```
//!
//! ## Building statements
//!
//! ```rust
//! use ddlsync_core::builder::SqlBuilder;
//! use ddlsync_core::schema::StringTable;
//!
//! let table = StringTable::with_names("StringTable", &["id", "last_login"], &["id"]);
//! let (sql, _) = SqlBuilder::new(&table).arg(1_i64).arg("today").upsert_sql().unwrap();
//! assert_eq!(
//!     sql,
//!     "INSERT INTO StringTable(id,last_login) VALUES ($1,$2) ON CONFLICT (id) DO UPDATE SET  last_login=EXCLUDED.last_login"
//! );
//! ```

pub mod builder;
pub mod classify;
pub mod grammar;
pub mod lexer;
pub mod schema;

pub use builder::{BuilderError, SqlBuilder, SqlValue};
pub use classify::{classify, DbError, ErrorKind};
pub use grammar::ParseError;
pub use schema::{Column, ColumnInfo, Index, SchemaRegistry, Table, TableInfo};
