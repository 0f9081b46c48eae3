//! Column drift detection and the ALTER clauses that correct it.

use std::fmt;

use serde::Serialize;

use super::column::ColumnInfo;
use super::types::{alter_target_type, canonical_type, is_character_type, is_serial};
use crate::grammar::ColumnDecl;

/// One kind of difference between a live column and its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlagColumn {
    MustNotNull,
    Nullable,
    ChangeType,
    ChangeDefault,
    ChangeLength,
    ChangeToArray,
}

impl FlagColumn {
    /// Flags that rewrite the column type.
    #[must_use]
    pub const fn is_type_change(self) -> bool {
        matches!(
            self,
            Self::ChangeType | Self::ChangeLength | Self::ChangeToArray
        )
    }
}

impl fmt::Display for FlagColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MustNotNull => "must not null",
            Self::Nullable => "nullable",
            Self::ChangeType => "change type",
            Self::ChangeDefault => "change default",
            Self::ChangeLength => "change length",
            Self::ChangeToArray => "change to array",
        };
        f.write_str(name)
    }
}

/// Compares a live column with its declaration.
#[must_use]
pub fn diff_column<C: ColumnInfo + ?Sized>(live: &C, decl: &ColumnDecl) -> Vec<FlagColumn> {
    let mut flags = Vec::new();
    let declared = canonical_type(&decl.type_text);
    let declared_array = declared.is_array || decl.is_array;
    let current = canonical_type(live.type_name());

    if declared_array && !current.is_array {
        flags.push(FlagColumn::ChangeToArray);
        if declared.udt != current.udt {
            flags.push(FlagColumn::ChangeType);
        }
    } else if declared_array != current.is_array || declared.udt != current.udt {
        flags.push(FlagColumn::ChangeType);
    } else if let Some(length) = decl.length {
        if is_character_type(&declared.udt)
            && !declared_array
            && live.character_max_length() != Some(length)
        {
            flags.push(FlagColumn::ChangeLength);
        }
    }

    let declared_not_null = decl.not_null || decl.primary_key || is_serial(&decl.type_text);
    if declared_not_null && live.is_nullable() {
        flags.push(FlagColumn::MustNotNull);
    } else if !declared_not_null && !live.is_nullable() && !live.is_primary_key() {
        flags.push(FlagColumn::Nullable);
    }

    if defaults_differ(live.default_value(), decl.default.as_deref()) {
        flags.push(FlagColumn::ChangeDefault);
    }

    flags
}

fn defaults_differ(live: Option<&str>, declared: Option<&str>) -> bool {
    match (live, declared) {
        (None, None) => false,
        // Sequence defaults come from serial/identity, not from the file.
        (Some(current), None) => !current.trim_start().to_ascii_lowercase().starts_with("nextval("),
        (None, Some(_)) => true,
        (Some(current), Some(wanted)) => normalize_default(current) != normalize_default(wanted),
    }
}

/// Lower-cased default with trailing `::type` casts and quotes removed.
#[must_use]
pub fn normalize_default(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    let mut in_quote = false;
    let mut depth = 0i32;
    let mut cut = lowered.len();
    let bytes = lowered.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            b':' if !in_quote && depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                cut = i;
                break;
            }
            _ => {}
        }
    }
    lowered[..cut].trim().trim_matches('\'').trim().to_string()
}

/// Quotes an identifier when PostgreSQL would otherwise fold or reject it.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// The `ALTER COLUMN` clauses that apply `flags` to the live column.
///
/// Type changes collapse into a single `TYPE ... USING ...` clause, placed
/// before default and nullability changes.
#[must_use]
pub fn alter_clauses<C: ColumnInfo + ?Sized>(
    live: &C,
    decl: &ColumnDecl,
    flags: &[FlagColumn],
) -> Vec<String> {
    let column = quote_ident(&decl.name);
    let mut clauses = Vec::new();

    if flags.contains(&FlagColumn::ChangeToArray) {
        let target = declared_target(decl);
        clauses.push(format!("ALTER COLUMN {column} DROP DEFAULT"));
        clauses.push(format!(
            "ALTER COLUMN {column} TYPE {target} USING array[{column}]::{target}"
        ));
    } else if flags.iter().any(|f| f.is_type_change()) {
        let target = declared_target(decl);
        let using = cast_expression(live.type_name(), &decl.type_text, &column, &target);
        clauses.push(format!("ALTER COLUMN {column} TYPE {target} USING {using}"));
    }

    if flags.contains(&FlagColumn::ChangeDefault) {
        match &decl.default {
            Some(default) => clauses.push(format!("ALTER COLUMN {column} SET DEFAULT {default}")),
            None => clauses.push(format!("ALTER COLUMN {column} DROP DEFAULT")),
        }
    }

    if flags.contains(&FlagColumn::MustNotNull) {
        clauses.push(format!("ALTER COLUMN {column} SET NOT NULL"));
    } else if flags.contains(&FlagColumn::Nullable) {
        clauses.push(format!("ALTER COLUMN {column} DROP NOT NULL"));
    }

    clauses
}

fn declared_target(decl: &ColumnDecl) -> String {
    let target = alter_target_type(&decl.type_text);
    if !decl.is_array || target.ends_with(']') {
        return target;
    }
    let lowered = target.to_ascii_lowercase();
    let base = lowered
        .strip_suffix(" array")
        .map_or(target.as_str(), |_| target[..target.len() - 6].trim_end());
    format!("{base}[]")
}

/// money and floating point types only convert through numeric.
fn cast_expression(live_type: &str, declared_type: &str, column: &str, target: &str) -> String {
    let from = canonical_type(live_type).udt;
    let to = canonical_type(declared_type).udt;
    let is_float = |udt: &str| matches!(udt, "float4" | "float8");
    if (from == "money" && is_float(&to)) || (is_float(&from) && to == "money") {
        format!("{column}::numeric::{target}")
    } else {
        format!("{column}::{target}")
    }
}

/// `ALTER TABLE t clause, clause, ...`.
#[must_use]
pub fn alter_table_sql(table: &str, clauses: &[String]) -> String {
    format!("ALTER TABLE {} {}", quote_ident(table), clauses.join(", "))
}

/// One `ALTER TABLE` adding every declared column in `decls`.
#[must_use]
pub fn add_columns_sql(table: &str, decls: &[&ColumnDecl]) -> String {
    let clauses: Vec<String> = decls
        .iter()
        .map(|d| format!("ADD COLUMN {}", d.definition))
        .collect();
    alter_table_sql(table, &clauses)
}

/// `UPDATE` that replaces NULLs with the declared default, if there is one.
#[must_use]
pub fn backfill_sql(table: &str, decl: &ColumnDecl) -> Option<String> {
    let default = decl.default.as_deref()?;
    let column = quote_ident(&decl.name);
    Some(format!(
        "UPDATE {} SET {column} = {default} WHERE {column} IS NULL",
        quote_ident(table)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_column_definition;
    use crate::schema::Column;

    fn decl(text: &str) -> ColumnDecl {
        parse_column_definition(text).unwrap()
    }

    #[test]
    fn matching_column_has_no_flags() {
        let live = Column::new("email", "varchar")
            .with_max_length(120)
            .nullable(false)
            .with_default("''::character varying");
        assert!(diff_column(&live, &decl("email varchar(120) NOT NULL DEFAULT ''")).is_empty());
    }

    #[test]
    fn serial_sequence_default_is_ignored() {
        let live = Column::new("id", "int4")
            .nullable(false)
            .with_default("nextval('users_id_seq'::regclass)")
            .auto_increment();
        assert!(diff_column(&live, &decl("id serial")).is_empty());
    }

    #[test]
    fn detects_every_flag_kind() {
        let live = Column::new("score", "int4");
        assert_eq!(
            diff_column(&live, &decl("score bigint NOT NULL DEFAULT 0")),
            vec![
                FlagColumn::ChangeType,
                FlagColumn::MustNotNull,
                FlagColumn::ChangeDefault
            ]
        );

        let live = Column::new("name", "varchar").with_max_length(20).nullable(false);
        assert_eq!(
            diff_column(&live, &decl("name varchar(64)")),
            vec![FlagColumn::ChangeLength, FlagColumn::Nullable]
        );

        let live = Column::new("tags", "int4").with_default("0");
        assert_eq!(
            diff_column(&live, &decl("tags integer[]")),
            vec![FlagColumn::ChangeToArray, FlagColumn::ChangeDefault]
        );
    }

    #[test]
    fn default_normalization() {
        assert_eq!(normalize_default("'active'::text"), "active");
        assert_eq!(normalize_default("'a::b'::text"), "a::b");
        assert_eq!(normalize_default("NOW()"), "now()");
        assert_eq!(normalize_default(" 'x' "), "x");
        assert_eq!(
            normalize_default("('now'::text)::date"),
            "('now'::text)"
        );
    }

    #[test]
    fn alter_clauses_for_type_and_nullability() {
        let live = Column::new("score", "int4");
        let declared = decl("score bigserial NOT NULL");
        let flags = diff_column(&live, &declared);
        assert_eq!(
            alter_clauses(&live, &declared, &flags),
            vec![
                "ALTER COLUMN score TYPE bigint USING score::bigint",
                "ALTER COLUMN score SET NOT NULL",
            ]
        );
    }

    #[test]
    fn alter_clauses_money_casts() {
        let live = Column::new("price", "money");
        let declared = decl("price double precision");
        let flags = diff_column(&live, &declared);
        assert_eq!(
            alter_clauses(&live, &declared, &flags),
            vec!["ALTER COLUMN price TYPE double precision USING price::numeric::double precision"]
        );
    }

    #[test]
    fn alter_clauses_to_array() {
        let live = Column::new("tags", "int4").with_default("0");
        let declared = decl("tags integer[] DEFAULT '{}'");
        let flags = diff_column(&live, &declared);
        assert_eq!(
            alter_clauses(&live, &declared, &flags),
            vec![
                "ALTER COLUMN tags DROP DEFAULT",
                "ALTER COLUMN tags TYPE integer[] USING array[tags]::integer[]",
                "ALTER COLUMN tags SET DEFAULT '{}'",
            ]
        );
    }

    #[test]
    fn table_level_sql() {
        let a = decl("a text");
        let b = decl("b int NOT NULL DEFAULT 1");
        assert_eq!(
            add_columns_sql("t", &[&a, &b]),
            "ALTER TABLE t ADD COLUMN a text, ADD COLUMN b int NOT NULL DEFAULT 1"
        );
        assert_eq!(
            backfill_sql("t", &b).as_deref(),
            Some("UPDATE t SET b = 1 WHERE b IS NULL")
        );
        assert_eq!(backfill_sql("t", &a), None);
        assert_eq!(quote_ident("Users"), "\"Users\"");
        assert_eq!(quote_ident("user_2"), "user_2");
    }
}
