//! Column descriptors.

use serde::Serialize;

use super::types::{canonical_type, is_character_type, is_serial};
use crate::grammar::ColumnDecl;

/// Read access to column metadata.
///
/// Implemented by introspected [`Column`]s and by synthetic
/// [`StringColumn`]s, so the SQL builder can work from either.
pub trait ColumnInfo {
    /// Column name.
    fn name(&self) -> &str;
    /// Catalog type name (`int4`, `_text`, ...).
    fn type_name(&self) -> &str;
    /// Whether the column is part of the primary key.
    fn is_primary_key(&self) -> bool;
    /// Whether NULLs are accepted.
    fn is_nullable(&self) -> bool;
    /// The default expression as the catalog reports it.
    fn default_value(&self) -> Option<&str>;
    /// `character_maximum_length`, for character types.
    fn character_max_length(&self) -> Option<i32>;
    /// Whether values come from a sequence or identity.
    fn is_auto_increment(&self) -> bool;
    /// Column comment.
    fn comment(&self) -> Option<&str>;
}

/// A live column, as read from the database catalog.
///
/// Fields are private: a live column only changes when its table is read
/// again after an ALTER.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    name: String,
    type_name: String,
    primary_key: bool,
    nullable: bool,
    default: Option<String>,
    character_max_length: Option<i32>,
    auto_increment: bool,
    comment: Option<String>,
}

impl Column {
    /// A nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            primary_key: false,
            nullable: true,
            default: None,
            character_max_length: None,
            auto_increment: false,
            comment: None,
        }
    }

    /// Marks the column as (part of) the primary key, which implies NOT NULL.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub const fn with_max_length(mut self, length: i32) -> Self {
        self.character_max_length = Some(length);
        self
    }

    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The column PostgreSQL would report after creating `decl`.
    #[must_use]
    pub fn from_decl(decl: &ColumnDecl) -> Self {
        let canonical = canonical_type(&decl.type_text);
        let type_name = if decl.is_array {
            format!("_{}", canonical.udt)
        } else {
            canonical.udt.clone()
        };
        let serial = is_serial(&decl.type_text);

        Self {
            name: decl.name.clone(),
            type_name,
            primary_key: decl.primary_key,
            nullable: !(decl.not_null || decl.primary_key || serial),
            default: decl.default.clone(),
            character_max_length: decl
                .length
                .filter(|_| is_character_type(&canonical.udt) && !decl.is_array),
            auto_increment: serial,
            comment: None,
        }
    }
}

impl ColumnInfo for Column {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    fn character_max_length(&self) -> Option<i32> {
        self.character_max_length
    }

    fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// A synthetic text column, for building SQL without a live catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringColumn {
    name: String,
    primary_key: bool,
}

impl StringColumn {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

impl ColumnInfo for StringColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        "text"
    }

    fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    fn is_nullable(&self) -> bool {
        !self.primary_key
    }

    fn default_value(&self) -> Option<&str> {
        None
    }

    fn character_max_length(&self) -> Option<i32> {
        None
    }

    fn is_auto_increment(&self) -> bool {
        false
    }

    fn comment(&self) -> Option<&str> {
        None
    }
}
