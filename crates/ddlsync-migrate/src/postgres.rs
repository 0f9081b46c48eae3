//! sqlx-backed [`Connection`] with catalog introspection.

use std::collections::BTreeMap;

use ddlsync_core::builder::SqlValue;
use ddlsync_core::classify::DbError;
use ddlsync_core::grammar::match_create_index;
use ddlsync_core::schema::{
    quote_ident, typmod_length, Column, PgType, PgTypeKind, Routine, RoutineKind, SchemaSnapshot,
    Table, TableKind,
};
use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as _, Postgres, Row, TypeInfo};
use tracing::{debug, warn};

use crate::connection::{same_family, Connection};
use crate::error::Result;

const RELATIONS: &str = "
SELECT c.relname::text, c.relkind::text, obj_description(c.oid, 'pg_class')
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = current_schema()
  AND c.relkind IN ('r', 'v', 'm', 'p')
  AND ($1::text IS NULL OR c.relname = $1)
ORDER BY c.relname";

const COLUMNS: &str = "
SELECT c.relname::text,
       a.attname::text,
       t.typname::text,
       a.attnotnull,
       pg_get_expr(d.adbin, d.adrelid),
       a.atttypmod,
       (a.attidentity <> '' OR coalesce(pg_get_expr(d.adbin, d.adrelid), '') LIKE 'nextval(%'),
       col_description(c.oid, a.attnum),
       EXISTS (SELECT 1 FROM pg_index i
               WHERE i.indrelid = c.oid AND i.indisprimary AND a.attnum = ANY (i.indkey))
FROM pg_attribute a
JOIN pg_class c ON c.oid = a.attrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
JOIN pg_type t ON t.oid = a.atttypid
LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
WHERE n.nspname = current_schema()
  AND c.relkind IN ('r', 'v', 'm', 'p')
  AND a.attnum > 0 AND NOT a.attisdropped
  AND ($1::text IS NULL OR c.relname = $1)
ORDER BY c.relname, a.attnum";

const INDEXES: &str = "
SELECT i.tablename::text, i.indexname::text, i.indexdef,
       EXISTS (SELECT 1 FROM pg_constraint con
               WHERE con.conname = i.indexname AND con.contype IN ('u', 'p', 'x'))
FROM pg_indexes i
WHERE i.schemaname = current_schema()
  AND ($1::text IS NULL OR i.tablename = $1)";

const FOREIGN_KEYS: &str = "
SELECT cl.relname::text, con.conname::text, pg_get_constraintdef(con.oid)
FROM pg_constraint con
JOIN pg_class cl ON cl.oid = con.conrelid
JOIN pg_namespace n ON n.oid = cl.relnamespace
WHERE con.contype = 'f'
  AND n.nspname = current_schema()
  AND ($1::text IS NULL OR cl.relname = $1)";

const ROUTINES: &str = "
SELECT p.proname::text, p.prokind::text, pg_get_function_identity_arguments(p.oid)
FROM pg_proc p
JOIN pg_namespace n ON n.oid = p.pronamespace
WHERE n.nspname = current_schema() AND p.prokind IN ('f', 'p')
ORDER BY p.proname";

const TYPES: &str = "
SELECT t.typname::text, t.typtype::text,
       coalesce(array_agg(e.enumlabel::text ORDER BY e.enumsortorder)
                FILTER (WHERE e.enumlabel IS NOT NULL), '{}')
FROM pg_type t
JOIN pg_namespace n ON n.oid = t.typnamespace
LEFT JOIN pg_enum e ON e.enumtypid = t.oid
LEFT JOIN pg_class c ON c.oid = t.typrelid
WHERE n.nspname = current_schema()
  AND (t.typtype IN ('e', 'd') OR (t.typtype = 'c' AND c.relkind = 'c'))
GROUP BY t.typname, t.typtype
ORDER BY t.typname";

type ColumnRow = (
    String,
    String,
    String,
    bool,
    Option<String>,
    i32,
    bool,
    Option<String>,
    bool,
);

/// Maps a driver error, keeping the SQLSTATE when the server sent one.
pub fn db_error(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db) => DbError {
            code: db.code().map(|c| c.into_owned()),
            message: db.message().to_string(),
        },
        _ => DbError::new(err.to_string()),
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(n) => query.bind(*n),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Blob(b) => query.bind(b.as_slice()),
        };
    }
    query
}

fn row_values(row: &PgRow) -> std::result::Result<Vec<SqlValue>, DbError> {
    row.columns()
        .iter()
        .map(|column| {
            let i = column.ordinal();
            let value = match column.type_info().name() {
                "BOOL" => row.try_get::<Option<bool>, _>(i).map(|v| v.map(SqlValue::Bool)),
                "INT2" => row
                    .try_get::<Option<i16>, _>(i)
                    .map(|v| v.map(|n| SqlValue::Int(i64::from(n)))),
                "INT4" => row
                    .try_get::<Option<i32>, _>(i)
                    .map(|v| v.map(|n| SqlValue::Int(i64::from(n)))),
                "INT8" => row.try_get::<Option<i64>, _>(i).map(|v| v.map(SqlValue::Int)),
                "FLOAT4" => row
                    .try_get::<Option<f32>, _>(i)
                    .map(|v| v.map(|f| SqlValue::Float(f64::from(f)))),
                "FLOAT8" => row.try_get::<Option<f64>, _>(i).map(|v| v.map(SqlValue::Float)),
                "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(i).map(|v| v.map(SqlValue::Blob)),
                _ => row.try_get::<Option<String>, _>(i).map(|v| v.map(SqlValue::Text)),
            };
            value
                .map(|v| v.unwrap_or(SqlValue::Null))
                .map_err(db_error)
        })
        .collect()
}

/// A PostgreSQL connection pool.
pub struct PgConnection {
    pool: PgPool,
    dry_run: bool,
}

impl PgConnection {
    /// Connects to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self::from_pool(pool))
    }

    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            dry_run: false,
        }
    }

    /// Enables dry-run mode: statements are printed, not executed.
    /// Introspection still reads the live catalog.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_tables(&self, only: Option<&str>) -> std::result::Result<Vec<Table>, DbError> {
        let mut tables: BTreeMap<String, Table> = BTreeMap::new();

        let relations: Vec<(String, String, Option<String>)> = sqlx::query_as(RELATIONS)
            .bind(only)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        for (name, relkind, comment) in relations {
            let Some(kind) = TableKind::from_relkind(&relkind) else {
                continue;
            };
            let mut table = Table::new(&name, kind);
            table.comment = comment;
            tables.insert(name, table);
        }

        let columns: Vec<ColumnRow> = sqlx::query_as(COLUMNS)
            .bind(only)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        for (table, name, udt, not_null, default, typmod, serial, comment, primary) in columns {
            let Some(table) = tables.get_mut(&table) else {
                continue;
            };
            let length = typmod_length(&udt, typmod);
            let mut column = Column::new(name, udt).nullable(!not_null);
            if primary {
                column = column.primary_key();
            }
            if let Some(default) = default {
                column = column.with_default(default);
            }
            if let Some(length) = length {
                column = column.with_max_length(length);
            }
            if serial {
                column = column.auto_increment();
            }
            if let Some(comment) = comment {
                column = column.with_comment(comment);
            }
            table.columns.push(column);
        }

        let indexes: Vec<(String, String, String, bool)> = sqlx::query_as(INDEXES)
            .bind(only)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        for (table, name, definition, constraint) in indexes {
            let Some(mut index) = match_create_index(&definition) else {
                warn!(index = %name, definition = %definition, "Unparsed index definition");
                continue;
            };
            index.constraint = constraint;
            if let Some(table) = tables.get_mut(&table) {
                table.indexes.push(index);
            }
        }

        let foreign_keys: Vec<(String, String, String)> = sqlx::query_as(FOREIGN_KEYS)
            .bind(only)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        for (table, name, definition) in foreign_keys {
            let statement = format!(
                "ALTER TABLE {} ADD CONSTRAINT {} {definition}",
                quote_ident(&table),
                quote_ident(&name)
            );
            let Some(index) = match_create_index(&statement) else {
                warn!(constraint = %name, definition = %definition, "Unparsed foreign key");
                continue;
            };
            if let Some(table) = tables.get_mut(&table) {
                table.indexes.push(index);
            }
        }

        Ok(tables.into_values().collect())
    }

    async fn load_routines(&self) -> std::result::Result<Vec<Routine>, DbError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(ROUTINES)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|(name, kind, arguments)| {
                let kind = if kind == "p" {
                    RoutineKind::Procedure
                } else {
                    RoutineKind::Function
                };
                Routine::new(name, kind, arguments)
            })
            .collect())
    }

    async fn load_types(&self) -> std::result::Result<Vec<PgType>, DbError> {
        let rows: Vec<(String, String, Vec<String>)> = sqlx::query_as(TYPES)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|(name, typtype, labels)| PgType {
                name,
                kind: match typtype.as_str() {
                    "e" => PgTypeKind::Enum,
                    "c" => PgTypeKind::Composite,
                    "d" => PgTypeKind::Domain,
                    _ => PgTypeKind::Other,
                },
                labels,
            })
            .collect())
    }
}

impl Connection for PgConnection {
    async fn exec_ddl(&self, sql: &str, args: &[SqlValue]) -> std::result::Result<(), DbError> {
        if self.dry_run {
            if args.is_empty() {
                println!("{sql};");
            } else {
                let args: Vec<String> = args.iter().map(SqlValue::to_sql_inline).collect();
                println!("{sql}; -- {}", args.join(", "));
            }
            return Ok(());
        }
        debug!(sql = %sql, "Executing SQL");
        if args.is_empty() {
            // Simple protocol: function files carry several statements.
            sqlx::raw_sql(sql).execute(&self.pool).await.map_err(db_error)?;
        } else {
            bind_all(sqlx::query(sql), args)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }

    async fn get_schema(&self) -> std::result::Result<SchemaSnapshot, DbError> {
        Ok(SchemaSnapshot {
            tables: self.load_tables(None).await?,
            routines: self.load_routines().await?,
            types: self.load_types().await?,
        })
    }

    async fn read_table(
        &self,
        name: &str,
        kind: TableKind,
    ) -> std::result::Result<Option<Table>, DbError> {
        Ok(self
            .load_tables(Some(name))
            .await?
            .into_iter()
            .find(|t| t.name == name && same_family(t.kind, kind)))
    }

    async fn select_and_run_each<F>(
        &self,
        sql: &str,
        args: &[SqlValue],
        mut f: F,
    ) -> std::result::Result<(), DbError>
    where
        F: FnMut(Vec<SqlValue>) -> std::result::Result<(), DbError>,
    {
        let mut rows = bind_all(sqlx::query(sql), args).fetch(&self.pool);
        while let Some(row) = rows.try_next().await.map_err(db_error)? {
            f(row_values(&row)?)?;
        }
        Ok(())
    }
}
