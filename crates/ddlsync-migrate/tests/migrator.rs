//! End-to-end runs over a DDL source tree.

mod common;

use common::{ddl_statements, write_tree, MockConnection};
use ddlsync_core::schema::{ColumnInfo, TableInfo, TableKind};
use ddlsync_migrate::config::MigrateConfig;
use ddlsync_migrate::migrator::{ddl_files, Migrator};

const TREE: &[(&str, &str)] = &[
    ("types/mood.ddl", "CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');"),
    (
        "table/orders.ddl",
        "CREATE TABLE orders (
            id serial PRIMARY KEY,
            user_id integer REFERENCES users,
            total numeric(10, 2) DEFAULT 0
        );
        CREATE INDEX orders_user ON orders (user_id);
        COMMENT ON COLUMN orders.total IS 'Gross amount';",
    ),
    (
        "table/users.ddl",
        "-- accounts
        CREATE TABLE users (
            id serial PRIMARY KEY,
            email varchar(120) NOT NULL,
            mood mood DEFAULT 'ok'
        );
        CREATE UNIQUE INDEX users_email ON users (lower(email));
        INSERT INTO users (email) VALUES ('admin@example.com');",
    ),
    (
        "view/order_totals.ddl",
        "CREATE OR REPLACE VIEW order_totals AS SELECT user_id, sum(total) FROM orders GROUP BY user_id;",
    ),
    (
        "func/touch.ddl",
        "CREATE OR REPLACE FUNCTION touch(target text) RETURNS void LANGUAGE plpgsql AS $$
BEGIN
    UPDATE users SET email = email WHERE email = target;
END;
$$;",
    ),
    ("table/README.md", "not a ddl file"),
    ("table/archive/old.ddl", "CREATE TABLE old (id int);"),
];

fn migrator(root: &std::path::Path) -> Migrator<MockConnection> {
    Migrator::new(MockConnection::new(), MigrateConfig::new(root))
}

#[tokio::test]
async fn applies_every_phase_and_replays_forward_references() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), TREE);
    let migrator = migrator(dir.path());

    let report = migrator.run().await.unwrap();
    assert!(!report.has_errors(), "{report:?}");
    // orders runs twice: once deferred on users, once replayed
    assert_eq!(report.files, 6);
    assert!(report.unresolved.is_empty());

    let conn = migrator.connection();
    let orders = conn.table("orders").unwrap();
    assert_eq!(orders.indexes.len(), 1);
    assert_eq!(
        orders.find_column("total").and_then(ColumnInfo::comment),
        Some("Gross amount")
    );
    assert_eq!(conn.table("order_totals").map(|t| t.kind), Some(TableKind::View));
    assert!(conn.table("old").is_none());
    assert_eq!(conn.pg_type("mood").unwrap().labels, vec!["sad", "ok", "happy"]);
    assert_eq!(migrator.registry().routines("touch").len(), 1);
    assert!(conn
        .statements()
        .iter()
        .any(|s| s.ends_with("VALUES ('admin@example.com') ON CONFLICT DO NOTHING")));
}

/// `CREATE OR REPLACE` views and functions have no live definition to
/// compare against, so they run on every pass. Everything else must stay
/// quiet.
#[tokio::test]
async fn second_run_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), TREE);
    let migrator = migrator(dir.path());
    migrator.run().await.unwrap();

    migrator.connection().clear_statements();
    let report = migrator.run().await.unwrap();
    assert!(!report.has_errors(), "{report:?}");
    assert_eq!(report.files, 5);

    let conn = migrator.connection();
    let (replaced, schema_changes): (Vec<String>, Vec<String>) = ddl_statements(conn)
        .into_iter()
        .partition(|s| s.starts_with("CREATE OR REPLACE"));
    assert!(schema_changes.is_empty(), "{schema_changes:?}");
    assert_eq!(replaced.len(), 2, "{replaced:?}");
    assert!(replaced[0].starts_with("CREATE OR REPLACE VIEW order_totals"));
    assert!(replaced[1].starts_with("CREATE OR REPLACE FUNCTION touch"));
}

#[tokio::test]
async fn unresolved_reference_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[(
            "table/orders.ddl",
            "CREATE TABLE orders (id serial PRIMARY KEY, ghost_id integer REFERENCES ghosts);",
        )],
    );
    let migrator = migrator(dir.path());

    let report = migrator.run().await.unwrap();
    assert!(report.has_errors());
    assert_eq!(report.errors, 0);
    assert_eq!(report.unresolved["ghosts"], vec![dir.path().join("table/orders.ddl")]);
}

#[tokio::test]
async fn unreadable_file_only_fails_itself() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("table/users.ddl", "CREATE TABLE users (id serial PRIMARY KEY);")]);
    std::fs::write(dir.path().join("table/broken.ddl"), [0xff, 0xfe, 0x00]).unwrap();
    let migrator = migrator(dir.path());

    let report = migrator.run().await.unwrap();
    assert_eq!(report.errors, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].file.ends_with("table/broken.ddl"));
    assert!(migrator.connection().table("users").is_some());
}

#[tokio::test]
async fn only_ddl_files_are_listed_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), TREE);

    let files = ddl_files(&dir.path().join("table")).await.unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["orders.ddl", "users.ddl"]);

    assert!(ddl_files(&dir.path().join("missing")).await.unwrap().is_empty());
}
