#![allow(dead_code)]

use ddlsync_core::grammar::{match_create_index, match_create_table, ColumnDecl, CreateTable};
use ddlsync_core::schema::{Index, StringTable};

pub fn create_table(sql: &str) -> CreateTable {
    match_create_table(sql).unwrap_or_else(|| panic!("Expected CREATE TABLE to match: {sql}"))
}

pub fn column_decl(sql: &str, name: &str) -> ColumnDecl {
    create_table(sql)
        .column(name)
        .cloned()
        .unwrap_or_else(|| panic!("Expected column {name} in: {sql}"))
}

pub fn index(sql: &str) -> Index {
    match_create_index(sql).unwrap_or_else(|| panic!("Expected index statement to match: {sql}"))
}

/// The synthetic table the builder tests render against.
pub fn string_table(columns: &[&str], primary: &[&str]) -> StringTable {
    StringTable::with_names("StringTable", columns, primary)
}
