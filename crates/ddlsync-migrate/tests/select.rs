//! Row streaming through the connection contract.

mod common;

use common::MockConnection;
use ddlsync_core::builder::{SqlBuilder, SqlValue};
use ddlsync_core::classify::{DbError, ErrorKind};
use ddlsync_core::schema::StringTable;
use ddlsync_migrate::connection::Connection;

fn rows() -> Vec<Vec<SqlValue>> {
    vec![
        vec![SqlValue::Int(1), SqlValue::Text("ann".into())],
        vec![SqlValue::Int(2), SqlValue::Null],
    ]
}

#[tokio::test]
async fn every_row_reaches_the_callback() {
    let conn = MockConnection::new().with_rows(rows());
    let users = StringTable::with_names("users", &["id", "name"], &["id"]);
    let (sql, args) = SqlBuilder::new(&users).select_sql().unwrap();

    let mut seen = Vec::new();
    conn.select_and_scan_each(&sql, &args, 2, |row| {
        seen.push(row);
        Ok(())
    })
    .await
    .unwrap();
    assert_eq!(seen, rows());
}

#[tokio::test]
async fn callback_error_stops_the_scan() {
    let conn = MockConnection::new().with_rows(rows());
    let mut calls = 0;
    let err = conn
        .select_and_run_each("SELECT id, name FROM users", &[], |_| {
            calls += 1;
            Err(DbError::new("stop"))
        })
        .await
        .unwrap_err();
    assert_eq!(err.message, "stop");
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn width_mismatch_is_a_scan_arity_error() {
    let conn = MockConnection::new().with_rows(rows());
    let err = conn
        .select_and_scan_each("SELECT id, name FROM users", &[], 3, |_| Ok(()))
        .await
        .unwrap_err();
    assert_eq!(
        err.kind(),
        ErrorKind::ScanArityMismatch {
            expected: 3,
            actual: Some(2),
        }
    );
}
