//! Parameterized SQL builder.
//!
//! Renders DML against any [`TableInfo`](crate::schema::TableInfo), live or
//! synthetic. Values never enter the statement text: every argument is a
//! `$n` placeholder, numbered in the order the arguments are given.
//!
//! # Example
//!
//! ```rust
//! use ddlsync_core::builder::SqlBuilder;
//! use ddlsync_core::schema::StringTable;
//!
//! let users = StringTable::with_names("users", &["id", "name"], &["id"]);
//! let (sql, args) = SqlBuilder::new(&users)
//!     .columns(&["name"])
//!     .filter(&["id"])
//!     .arg("ann")
//!     .arg(7_i64)
//!     .update_sql()
//!     .unwrap();
//!
//! assert_eq!(sql, "UPDATE users SET name=$1 WHERE  id = $2");
//! assert_eq!(args.len(), 2);
//! ```

mod error;
mod sql_builder;
pub mod value;

pub use error::BuilderError;
pub use sql_builder::{where_clause, BuildOption, SqlBuilder};
pub use value::{SqlValue, ToSqlValue};
