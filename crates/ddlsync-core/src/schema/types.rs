//! PostgreSQL type name canonicalization.
//!
//! Declared DDL spells types the way people write them (`integer`,
//! `character varying(64)`, `text[]`), while introspection reports the
//! `udt_name` (`int4`, `varchar`, `_text`). Both sides go through
//! [`canonical_type`] before comparison.

use serde::Serialize;

/// A type reduced to its catalog name plus array-ness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalType {
    /// Catalog (`udt_name`) spelling of the element type.
    pub udt: String,
    /// True for array types.
    pub is_array: bool,
}

/// Reduces a declared or introspected type name to its canonical form.
///
/// Length modifiers are discarded; see [`type_length`].
#[must_use]
pub fn canonical_type(type_text: &str) -> CanonicalType {
    let lowered = type_text.trim().to_ascii_lowercase();
    let mut is_array = false;

    let mut base = strip_modifiers(&lowered);
    if base.ends_with("[]") {
        is_array = true;
        base = base.trim_end_matches("[]").trim_end().to_string();
    }
    if let Some(stripped) = base.strip_suffix(" array") {
        is_array = true;
        base = stripped.trim_end().to_string();
    }
    if let Some(element) = base.strip_prefix('_') {
        is_array = true;
        base = element.to_string();
    }
    let base = base.rsplit('.').next().unwrap_or(&base).trim_matches('"').to_string();

    CanonicalType {
        udt: udt_alias(&base).to_string(),
        is_array,
    }
}

/// Removes `(n)` / `(p, s)` and collapses whitespace, keeping `[]`.
fn strip_modifiers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '[' | ']' if depth == 0 => out.push(c),
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    let collapsed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    // `integer [ ]` and `integer[3]` both mean an array.
    collapsed
        .replace(" [", "[")
        .replace("[ ]", "[]")
        .split('[')
        .enumerate()
        .map(|(i, part)| if i == 0 { part.to_string() } else { "[]".to_string() })
        .collect::<String>()
        .replace("[][]", "[]")
}

fn udt_alias(base: &str) -> &str {
    match base {
        "int" | "integer" | "int4" | "serial" | "serial4" => "int4",
        "bigint" | "int8" | "bigserial" | "serial8" => "int8",
        "smallint" | "int2" | "smallserial" | "serial2" => "int2",
        "character varying" | "varchar" => "varchar",
        "character" | "char" | "bpchar" => "bpchar",
        "boolean" | "bool" => "bool",
        "real" | "float4" => "float4",
        "double precision" | "float8" | "float" => "float8",
        "decimal" | "numeric" => "numeric",
        "timestamp" | "timestamp without time zone" => "timestamp",
        "timestamptz" | "timestamp with time zone" => "timestamptz",
        "time" | "time without time zone" => "time",
        "timetz" | "time with time zone" => "timetz",
        "bit varying" | "varbit" => "varbit",
        other => other,
    }
}

/// The first length/precision modifier of a declared type, e.g. `64`
/// for `varchar(64)`.
#[must_use]
pub fn type_length(type_text: &str) -> Option<i32> {
    let open = type_text.find('(')?;
    let close = type_text[open..].find(')')? + open;
    type_text[open + 1..close]
        .split(',')
        .next()
        .and_then(|n| n.trim().parse().ok())
}

/// True for types whose length modifier is a character/bit length.
#[must_use]
pub fn is_character_type(udt: &str) -> bool {
    matches!(udt, "varchar" | "bpchar" | "bit" | "varbit")
}

/// Declared length carried by a catalog type modifier (`atttypmod`).
/// Character types store the length plus a 4-byte header; bit types store
/// it as is. `-1` means no modifier.
#[must_use]
pub fn typmod_length(udt: &str, typmod: i32) -> Option<i32> {
    match udt {
        "varchar" | "bpchar" if typmod > 4 => Some(typmod - 4),
        "bit" | "varbit" if typmod > 0 => Some(typmod),
        _ => None,
    }
}

/// True for `serial`-family pseudo types.
#[must_use]
pub fn is_serial(type_text: &str) -> bool {
    matches!(
        canonical_word(type_text).as_str(),
        "serial" | "serial4" | "bigserial" | "serial8" | "smallserial" | "serial2"
    )
}

fn canonical_word(type_text: &str) -> String {
    type_text
        .trim()
        .to_ascii_lowercase()
        .trim_end_matches("[]")
        .trim()
        .to_string()
}

/// The type to use in `ALTER COLUMN ... TYPE`: serial pseudo types become
/// their storage type, everything else is kept as written.
#[must_use]
pub fn alter_target_type(type_text: &str) -> String {
    let trimmed = type_text.trim();
    let (base, suffix) = trimmed
        .find('[')
        .map_or((trimmed, ""), |at| (trimmed[..at].trim_end(), &trimmed[at..]));
    let replaced = match base.to_ascii_lowercase().as_str() {
        "serial" | "serial4" => "integer".to_string(),
        "bigserial" | "serial8" => "bigint".to_string(),
        "smallserial" | "serial2" => "smallint".to_string(),
        _ => base.to_string(),
    };
    format!("{replaced}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udt(text: &str) -> (String, bool) {
        let t = canonical_type(text);
        (t.udt, t.is_array)
    }

    #[test]
    fn declared_spellings_match_catalog_names() {
        assert_eq!(udt("INTEGER"), ("int4".into(), false));
        assert_eq!(udt("serial"), ("int4".into(), false));
        assert_eq!(udt("bigserial"), ("int8".into(), false));
        assert_eq!(udt("character varying(255)"), ("varchar".into(), false));
        assert_eq!(udt("timestamp with time zone"), ("timestamptz".into(), false));
        assert_eq!(udt("double precision"), ("float8".into(), false));
        assert_eq!(udt("numeric(10, 2)"), ("numeric".into(), false));
        assert_eq!(udt("public.mood"), ("mood".into(), false));
    }

    #[test]
    fn arrays_from_both_sides() {
        assert_eq!(udt("integer[]"), ("int4".into(), true));
        assert_eq!(udt("text [ ]"), ("text".into(), true));
        assert_eq!(udt("int[3]"), ("int4".into(), true));
        assert_eq!(udt("varchar(20)[]"), ("varchar".into(), true));
        assert_eq!(udt("integer ARRAY"), ("int4".into(), true));
        assert_eq!(udt("_int4"), ("int4".into(), true));
    }

    #[test]
    fn lengths() {
        assert_eq!(type_length("varchar(64)"), Some(64));
        assert_eq!(type_length("numeric(10, 2)"), Some(10));
        assert_eq!(type_length("text"), None);
        assert!(is_character_type("varchar"));
        assert!(!is_character_type("numeric"));
    }

    #[test]
    fn catalog_lengths() {
        assert_eq!(typmod_length("varchar", 124), Some(120));
        assert_eq!(typmod_length("bit", 8), Some(8));
        assert_eq!(typmod_length("varbit", 64), Some(64));
        assert_eq!(typmod_length("varchar", -1), None);
        assert_eq!(typmod_length("numeric", 655_366), None);
    }

    #[test]
    fn alter_targets_replace_serials() {
        assert_eq!(alter_target_type("serial"), "integer");
        assert_eq!(alter_target_type("BIGSERIAL"), "bigint");
        assert_eq!(alter_target_type("smallserial"), "smallint");
        assert_eq!(alter_target_type("serial[]"), "integer[]");
        assert_eq!(alter_target_type("varchar(20)"), "varchar(20)");
        assert!(is_serial("bigserial"));
        assert!(!is_serial("bigint"));
    }
}
