//! Parameterized DML over a [`TableInfo`].

use super::error::BuilderError;
use super::value::{SqlValue, ToSqlValue};
use crate::schema::{ColumnInfo, TableInfo};

/// One composable setting of a pending statement.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOption {
    /// Explicit column list; defaults to every table column.
    Columns(Vec<String>),
    /// Filter columns, each optionally prefixed with `>`, `<`, `~`, `^` or
    /// `$`.
    Filter(Vec<String>),
    Args(Vec<SqlValue>),
    /// Text after `ON CONFLICT` for inserts.
    OnConflict(String),
}

/// A statement under construction. Rendering consumes it.
#[derive(Debug)]
pub struct SqlBuilder<'a, T: TableInfo + ?Sized> {
    table: &'a T,
    columns: Vec<String>,
    filter: Vec<String>,
    args: Vec<SqlValue>,
    on_conflict: Option<String>,
}

impl<'a, T: TableInfo + ?Sized> SqlBuilder<'a, T> {
    #[must_use]
    pub const fn new(table: &'a T) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filter: Vec::new(),
            args: Vec::new(),
            on_conflict: None,
        }
    }

    /// Applies options in order; later options of the same kind win.
    #[must_use]
    pub fn with_options(mut self, options: impl IntoIterator<Item = BuildOption>) -> Self {
        for option in options {
            match option {
                BuildOption::Columns(columns) => self.columns = columns,
                BuildOption::Filter(filter) => self.filter = filter,
                BuildOption::Args(args) => self.args = args,
                BuildOption::OnConflict(clause) => self.on_conflict = Some(clause),
            }
        }
        self
    }

    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: &[&str]) -> Self {
        self.filter = filter.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, value: impl ToSqlValue) -> Self {
        self.args.push(value.to_sql_value());
        self
    }

    #[must_use]
    pub fn args(mut self, args: Vec<SqlValue>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn on_conflict(mut self, clause: impl Into<String>) -> Self {
        self.on_conflict = Some(clause.into());
        self
    }

    /// The explicit columns, or every table column.
    fn target_columns(&self) -> Vec<String> {
        if self.columns.is_empty() {
            self.table
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        } else {
            self.columns.clone()
        }
    }

    fn check_args(&self, expected: usize) -> Result<(), BuilderError> {
        if self.args.len() == expected {
            Ok(())
        } else {
            Err(BuilderError::WrongArgsLen {
                expected,
                got: self.args.len(),
            })
        }
    }

    /// `INSERT INTO t(a,b) VALUES ($1,$2)[ ON CONFLICT ...]`
    ///
    /// # Errors
    ///
    /// `WrongArgsLen` unless there is one argument per column.
    pub fn insert_sql(self) -> Result<(String, Vec<SqlValue>), BuilderError> {
        let columns = self.target_columns();
        self.check_args(columns.len())?;
        let mut sql = insert_head(self.table.name(), &columns);
        if let Some(clause) = &self.on_conflict {
            sql.push_str(" ON CONFLICT ");
            sql.push_str(clause);
        }
        Ok((sql, self.args))
    }

    /// `INSERT ... ON CONFLICT (pk) DO UPDATE SET  c=EXCLUDED.c`
    ///
    /// Primary-key columns form the conflict target and the rest are
    /// updated. With no key column the insert becomes `ON CONFLICT DO
    /// NOTHING`; with only key columns, `ON CONFLICT (pk) DO NOTHING`.
    ///
    /// # Errors
    ///
    /// `NotFoundColumn` when a column is not on the table, `WrongArgsLen`
    /// unless there is one argument per column.
    pub fn upsert_sql(self) -> Result<(String, Vec<SqlValue>), BuilderError> {
        let columns = self.target_columns();
        let mut keys = Vec::new();
        let mut rest = Vec::new();
        for name in &columns {
            let column = self.table.find_column(name).ok_or_else(|| {
                BuilderError::NotFoundColumn {
                    table: self.table.name().to_string(),
                    column: name.clone(),
                }
            })?;
            if column.is_primary_key() {
                keys.push(name.as_str());
            } else {
                rest.push(name.as_str());
            }
        }
        self.check_args(columns.len())?;

        let mut sql = insert_head(self.table.name(), &columns);
        if keys.is_empty() {
            sql.push_str(" ON CONFLICT DO NOTHING");
        } else if rest.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", keys.join(",")));
        } else {
            let set: Vec<String> = rest.iter().map(|c| format!("{c}=EXCLUDED.{c}")).collect();
            sql.push_str(&format!(
                " ON CONFLICT ({}) DO UPDATE SET  {}",
                keys.join(","),
                set.join(", ")
            ));
        }
        Ok((sql, self.args))
    }

    /// `UPDATE t SET a=$1,b=$2 WHERE  f = $3`
    ///
    /// # Errors
    ///
    /// `WrongArgsLen` unless the arguments cover every SET column followed
    /// by every filter column.
    pub fn update_sql(self) -> Result<(String, Vec<SqlValue>), BuilderError> {
        let columns = self.target_columns();
        self.check_args(columns.len() + self.filter.len())?;
        let set: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c}={}", SqlValue::placeholder(i + 1)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {}{}",
            self.table.name(),
            set.join(","),
            where_clause(&self.filter, columns.len() + 1)
        );
        Ok((sql, self.args))
    }

    /// `SELECT a,b FROM t[ WHERE ...]`, projecting `*` when neither explicit
    /// nor table columns are known.
    ///
    /// # Errors
    ///
    /// `WrongArgsLen` unless there is one argument per filter column.
    pub fn select_sql(self) -> Result<(String, Vec<SqlValue>), BuilderError> {
        self.check_args(self.filter.len())?;
        let columns = self.target_columns();
        let projection = if columns.is_empty() {
            String::from("*")
        } else {
            columns.join(",")
        };
        let sql = format!(
            "SELECT {projection} FROM {}{}",
            self.table.name(),
            where_clause(&self.filter, 1)
        );
        Ok((sql, self.args))
    }

    /// `DELETE FROM t[ WHERE ...]`
    ///
    /// # Errors
    ///
    /// `WrongArgsLen` unless there is one argument per filter column.
    pub fn delete_sql(self) -> Result<(String, Vec<SqlValue>), BuilderError> {
        self.check_args(self.filter.len())?;
        let sql = format!(
            "DELETE FROM {}{}",
            self.table.name(),
            where_clause(&self.filter, 1)
        );
        Ok((sql, self.args))
    }
}

fn insert_head(table: &str, columns: &[String]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(SqlValue::placeholder).collect();
    format!(
        "INSERT INTO {table}({}) VALUES ({})",
        columns.join(","),
        placeholders.join(",")
    )
}

/// Renders ` WHERE ` plus one ` name op $n` clause per filter, ANDed in
/// order, numbering placeholders from `first`. Empty for no filters.
#[must_use]
pub fn where_clause(filter: &[String], first: usize) -> String {
    if filter.is_empty() {
        return String::new();
    }
    let clauses: Vec<String> = filter
        .iter()
        .enumerate()
        .map(|(i, f)| filter_clause(f, &SqlValue::placeholder(first + i)))
        .collect();
    format!(" WHERE {}", clauses.join(" AND"))
}

fn filter_clause(filter: &str, param: &str) -> String {
    let mut chars = filter.chars();
    let prefix = chars.next();
    let name = chars.as_str();
    match prefix {
        Some(op @ ('>' | '<')) => format!(" {name} {op} {param}"),
        Some('~') => format!(" {name} ~ {param}"),
        Some('^') => format!(" {name} ~ ('^' || {param})"),
        Some('$') => format!(" {name} ~ ({param} || '$')"),
        _ => format!(" {filter} = {param}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StringTable;

    fn table() -> StringTable {
        StringTable::with_names("StringTable", &["id", "last_login", "name"], &["id"])
    }

    #[test]
    fn test_where_prefixes() {
        let filter: Vec<String> = ["<id", ">age", "~bio", "^name", "$mail", "kind"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        assert_eq!(
            where_clause(&filter, 3),
            " WHERE  id < $3 AND age > $4 AND bio ~ $5 AND name ~ ('^' || $6) \
             AND mail ~ ($7 || '$') AND kind = $8"
        );
        assert_eq!(where_clause(&[], 1), "");
    }

    #[test]
    fn test_options_compose() {
        let table = table();
        let (sql, args) = SqlBuilder::new(&table)
            .with_options([
                BuildOption::Columns(vec!["name".into()]),
                BuildOption::Args(vec![SqlValue::Text("ann".into())]),
                BuildOption::OnConflict("DO NOTHING".into()),
            ])
            .insert_sql()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO StringTable(name) VALUES ($1) ON CONFLICT DO NOTHING"
        );
        assert_eq!(args, vec![SqlValue::Text("ann".into())]);
    }

    #[test]
    fn test_insert_defaults_to_table_columns() {
        let table = table();
        let (sql, _) = SqlBuilder::new(&table)
            .arg(1_i64)
            .arg("now")
            .arg("ann")
            .insert_sql()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO StringTable(id,last_login,name) VALUES ($1,$2,$3)"
        );
    }

    #[test]
    fn test_upsert_without_key_or_without_rest() {
        let table = table();
        let (sql, _) = SqlBuilder::new(&table)
            .columns(&["name"])
            .arg("ann")
            .upsert_sql()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO StringTable(name) VALUES ($1) ON CONFLICT DO NOTHING"
        );

        let (sql, _) = SqlBuilder::new(&table)
            .columns(&["id"])
            .arg(7_i64)
            .upsert_sql()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO StringTable(id) VALUES ($1) ON CONFLICT (id) DO NOTHING"
        );
    }

    #[test]
    fn test_select_star_without_columns() {
        let empty = StringTable::new("logs", Vec::new());
        let (sql, args) = SqlBuilder::new(&empty)
            .filter(&["level"])
            .arg("warn")
            .select_sql()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM logs WHERE  level = $1");
        assert_eq!(args.len(), 1);
    }
}
