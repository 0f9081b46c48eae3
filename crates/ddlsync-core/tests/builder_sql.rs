//! Statement text and argument numbering of the SQL builder.

mod common;

use common::string_table;
use ddlsync_core::builder::{BuildOption, BuilderError, SqlBuilder, SqlValue};

#[test]
fn insert_round_trip() {
    let table = string_table(&["id", "last_login", "name"], &["id"]);

    let (sql, args) = SqlBuilder::new(&table)
        .columns(&["last_login"])
        .arg("2024-01-01")
        .insert_sql()
        .unwrap();
    assert_eq!(sql, "INSERT INTO StringTable(last_login) VALUES ($1)");
    assert_eq!(args, vec![SqlValue::Text("2024-01-01".into())]);

    let (sql, args) = SqlBuilder::new(&table)
        .columns(&["last_login", "name"])
        .arg("2024-01-01")
        .arg("ann")
        .insert_sql()
        .unwrap();
    assert_eq!(sql, "INSERT INTO StringTable(last_login,name) VALUES ($1,$2)");
    assert_eq!(args.len(), 2);
}

#[test]
fn insert_wrong_args_len() {
    let table = string_table(&["id", "last_login"], &["id"]);
    let err = SqlBuilder::new(&table)
        .columns(&["last_login", "id"])
        .arg("x")
        .insert_sql()
        .unwrap_err();
    assert_eq!(err, BuilderError::WrongArgsLen { expected: 2, got: 1 });
}

#[test]
fn upsert_round_trip() {
    let table = string_table(&["id", "last_login"], &["id"]);
    let (sql, _) = SqlBuilder::new(&table)
        .columns(&["id", "last_login"])
        .arg(1_i64)
        .arg("today")
        .upsert_sql()
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO StringTable(id,last_login) VALUES ($1,$2) ON CONFLICT (id) DO UPDATE SET  last_login=EXCLUDED.last_login"
    );
}

#[test]
fn upsert_unknown_column() {
    let table = string_table(&["id", "last_login"], &["id"]);
    let err = SqlBuilder::new(&table)
        .columns(&["id", "nickname"])
        .arg(1_i64)
        .arg("x")
        .upsert_sql()
        .unwrap_err();
    assert_eq!(
        err,
        BuilderError::NotFoundColumn {
            table: "StringTable".into(),
            column: "nickname".into()
        }
    );
}

#[test]
fn update_numbers_set_then_where() {
    let table = string_table(&["id", "last_login", "name"], &["id"]);
    let (sql, args) = SqlBuilder::new(&table)
        .with_options([
            BuildOption::Columns(vec!["last_login".into(), "name".into()]),
            BuildOption::Filter(vec!["id".into(), ">last_login".into()]),
            BuildOption::Args(vec![
                SqlValue::Text("now".into()),
                SqlValue::Text("ann".into()),
                SqlValue::Int(3),
                SqlValue::Text("then".into()),
            ]),
        ])
        .update_sql()
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE StringTable SET last_login=$1,name=$2 WHERE  id = $3 AND last_login > $4"
    );
    assert_eq!(args[2], SqlValue::Int(3));

    let err = SqlBuilder::new(&table)
        .columns(&["name"])
        .filter(&["id"])
        .arg("ann")
        .update_sql()
        .unwrap_err();
    assert_eq!(err, BuilderError::WrongArgsLen { expected: 2, got: 1 });
}

#[test]
fn select_where_prefixes() {
    let table = string_table(&["id", "name"], &["id"]);

    let (sql, _) = SqlBuilder::new(&table)
        .filter(&["<id"])
        .arg(10_i64)
        .select_sql()
        .unwrap();
    assert_eq!(sql, "SELECT id,name FROM StringTable WHERE  id < $1");

    let (sql, _) = SqlBuilder::new(&table)
        .columns(&["name"])
        .filter(&["$name"])
        .arg("son")
        .select_sql()
        .unwrap();
    assert_eq!(sql, "SELECT name FROM StringTable WHERE  name ~ ($1 || '$')");

    let (sql, _) = SqlBuilder::new(&table)
        .filter(&["^name", "~name"])
        .arg("an")
        .arg("n")
        .select_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT id,name FROM StringTable WHERE  name ~ ('^' || $1) AND name ~ $2"
    );

    assert!(SqlBuilder::new(&table).filter(&["id"]).select_sql().is_err());
}

#[test]
fn delete_with_and_without_filter() {
    let table = string_table(&["id", "name"], &["id"]);
    let (sql, args) = SqlBuilder::new(&table).delete_sql().unwrap();
    assert_eq!(sql, "DELETE FROM StringTable");
    assert!(args.is_empty());

    let (sql, _) = SqlBuilder::new(&table)
        .filter(&["id", "name"])
        .arg(1_i64)
        .arg("ann")
        .delete_sql()
        .unwrap();
    assert_eq!(sql, "DELETE FROM StringTable WHERE  id = $1 AND name = $2");
}
