//! `CREATE INDEX` and `ALTER TABLE ... ADD CONSTRAINT`.

use super::cursor::{word_text, Cursor};
use super::error::ParseError;
use super::render::{render, unwrap_parens};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::schema::{ForeignKey, ForeignKeyAction, Index};

/// Matches either index-shaped statement.
///
/// # Errors
///
/// Returns a `ParseError` when the statement is neither a `CREATE INDEX`
/// nor an `ADD CONSTRAINT ... FOREIGN KEY | UNIQUE`.
pub fn parse_index(sql: &str) -> Result<Index, ParseError> {
    let cursor = Cursor::new(sql);
    if cursor.check_keyword(Keyword::Alter) {
        parse_add_constraint(cursor)
    } else {
        parse_create_index(cursor)
    }
}

/// `CREATE [UNIQUE] INDEX [CONCURRENTLY] [IF NOT EXISTS] name ON [ONLY]
/// table [USING method] (elements) [INCLUDE (...)] [NULLS [NOT] DISTINCT]
/// [WITH (...)] [TABLESPACE t] [WHERE predicate]`
fn parse_create_index(mut cursor: Cursor<'_>) -> Result<Index, ParseError> {
    cursor.expect_keyword(Keyword::Create)?;
    let unique = cursor.eat_keyword(Keyword::Unique);
    cursor.expect_keyword(Keyword::Index)?;
    let _ = cursor.eat_keyword(Keyword::Concurrently);
    cursor.eat_if_not_exists()?;
    let name = cursor.expect_object_name()?;
    cursor.expect_keyword(Keyword::On)?;
    let _ = cursor.eat_keyword(Keyword::Only);
    let table = cursor.expect_object_name()?;
    let method = if cursor.eat_keyword(Keyword::Using) {
        Some(cursor.expect_name()?)
    } else {
        None
    };

    let src = cursor.src();
    let ranges = cursor.parenthesized()?;
    let elements: Vec<&[Token]> = ranges.into_iter().map(|r| cursor.tokens(r)).collect();
    let (columns, expr) = index_elements(src, &elements);

    let mut where_clause = None;
    while !cursor.at_end() {
        if cursor.eat_keyword(Keyword::Include) || cursor.eat_keyword(Keyword::With) {
            cursor.parenthesized()?;
        } else if cursor.eat_keyword(Keyword::Nulls) {
            let _ = cursor.eat_keyword(Keyword::Not);
            if !cursor.eat_word("distinct") {
                return Err(ParseError::new("expected DISTINCT", cursor.current().span));
            }
        } else if cursor.eat_word("tablespace") {
            cursor.expect_name()?;
        } else if cursor.eat_keyword(Keyword::Where) {
            where_clause = Some(cursor.rest_text().to_string());
            cursor.skip_rest();
        } else {
            return Err(ParseError::unexpected(
                "INCLUDE, WITH, TABLESPACE or WHERE",
                cursor.current().kind.clone(),
                cursor.current().span,
            ));
        }
    }

    Ok(Index {
        name,
        table,
        columns,
        expr,
        unique,
        method,
        foreign: None,
        where_clause,
        constraint: false,
    })
}

/// Tracked columns plus, when any element is an expression, the rendered
/// element list with trailing `)` stripped.
fn index_elements(src: &str, elements: &[&[Token]]) -> (Vec<String>, Option<String>) {
    let mut columns = Vec::new();
    let mut rendered = Vec::new();
    let mut functional = false;

    for element in elements {
        let element = unwrap_parens(element);
        if is_plain_element(element) {
            if let Some(name) = element.first().and_then(|t| word_text(t, src)) {
                rendered.push(name.clone());
                columns.push(name);
            }
        } else {
            functional = true;
            rendered.push(render(src, element));
            if let Some(name) = first_column(src, element) {
                columns.push(name);
            }
        }
    }

    let expr = functional.then(|| rendered.join(", ").trim_end_matches(')').to_string());
    (columns, expr)
}

/// A column, optionally followed by COLLATE / opclass / ASC / DESC /
/// NULLS FIRST|LAST, all of which are words.
fn is_plain_element(tokens: &[Token]) -> bool {
    tokens.first().is_some_and(Token::is_word) && tokens.iter().all(Token::is_word)
}

/// The first token in an expression that names a column: not a function
/// name, not a literal, not a cast target.
fn first_column(src: &str, tokens: &[Token]) -> Option<String> {
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let next = tokens.get(i + 1).map(|t| &t.kind);
        if matches!(token.kind, TokenKind::DoubleColon) {
            i += 1;
            while tokens.get(i).is_some_and(Token::is_word) {
                i += 1;
            }
            continue;
        }
        if token.is_word() && !matches!(next, Some(TokenKind::LeftParen)) && !is_expression_keyword(token) {
            return word_text(token, src);
        }
        i += 1;
    }
    None
}

fn is_expression_keyword(token: &Token) -> bool {
    matches!(
        token.as_keyword(),
        Some(
            Keyword::Asc
                | Keyword::Desc
                | Keyword::Nulls
                | Keyword::First
                | Keyword::Last
                | Keyword::Collate
                | Keyword::Null
                | Keyword::Not
                | Keyword::Is
                | Keyword::Or
                | Keyword::Array
        )
    )
}

/// `ALTER TABLE [IF EXISTS] [ONLY] t ADD CONSTRAINT c {FOREIGN KEY (cols)
/// REFERENCES t2 [(cols)] [MATCH x] [ON UPDATE a] [ON DELETE a] | UNIQUE
/// (cols)} ...`
fn parse_add_constraint(mut cursor: Cursor<'_>) -> Result<Index, ParseError> {
    cursor.expect_keyword(Keyword::Alter)?;
    cursor.expect_keyword(Keyword::Table)?;
    if cursor.eat_keyword(Keyword::If) {
        cursor.expect_keyword(Keyword::Exists)?;
    }
    let _ = cursor.eat_keyword(Keyword::Only);
    let table = cursor.expect_object_name()?;
    cursor.expect_keyword(Keyword::Add)?;
    cursor.expect_keyword(Keyword::Constraint)?;
    let name = cursor.expect_name()?;

    let mut index = Index {
        name,
        table,
        columns: Vec::new(),
        expr: None,
        unique: false,
        method: None,
        foreign: None,
        where_clause: None,
        constraint: true,
    };

    if cursor.eat_keyword(Keyword::Unique) {
        index.unique = true;
        index.columns = cursor.name_list()?;
        // INCLUDE / WITH / USING INDEX TABLESPACE / DEFERRABLE
        cursor.skip_rest();
        return Ok(index);
    }

    cursor.expect_keyword(Keyword::Foreign)?;
    cursor.expect_keyword(Keyword::Key)?;
    index.columns = cursor.name_list()?;
    cursor.expect_keyword(Keyword::References)?;
    let mut foreign = ForeignKey {
        table: cursor.expect_object_name()?,
        columns: Vec::new(),
        on_update: ForeignKeyAction::NoAction,
        on_delete: ForeignKeyAction::NoAction,
    };
    if cursor.check(&TokenKind::LeftParen) {
        foreign.columns = cursor.name_list()?;
    }

    while !cursor.at_end() {
        if cursor.eat_keyword(Keyword::Match) {
            cursor.expect_name()?;
        } else if cursor.eat_keyword(Keyword::On) {
            if cursor.eat_keyword(Keyword::Update) {
                foreign.on_update = foreign_key_action(&mut cursor)?;
            } else {
                cursor.expect_keyword(Keyword::Delete)?;
                foreign.on_delete = foreign_key_action(&mut cursor)?;
            }
        } else if cursor.eat_keyword(Keyword::Not)
            || cursor.eat_keyword(Keyword::Deferrable)
            || cursor.eat_keyword(Keyword::Initially)
        {
            // NOT VALID, [NOT] DEFERRABLE, INITIALLY DEFERRED|IMMEDIATE
            if !cursor.check_keyword(Keyword::Deferrable) && !cursor.check_keyword(Keyword::On) {
                let _ = cursor.eat_word("valid")
                    || cursor.eat_word("deferred")
                    || cursor.eat_word("immediate");
            }
        } else {
            return Err(ParseError::unexpected(
                "ON UPDATE, ON DELETE or end of statement",
                cursor.current().kind.clone(),
                cursor.current().span,
            ));
        }
    }

    index.foreign = Some(foreign);
    Ok(index)
}

fn foreign_key_action(cursor: &mut Cursor<'_>) -> Result<ForeignKeyAction, ParseError> {
    if cursor.eat_keyword(Keyword::Cascade) {
        Ok(ForeignKeyAction::Cascade)
    } else if cursor.eat_keyword(Keyword::Restrict) {
        Ok(ForeignKeyAction::Restrict)
    } else if cursor.eat_keyword(Keyword::No) {
        cursor.expect_keyword(Keyword::Action)?;
        Ok(ForeignKeyAction::NoAction)
    } else {
        cursor.expect_keyword(Keyword::Set)?;
        let action = if cursor.eat_keyword(Keyword::Null) {
            ForeignKeyAction::SetNull
        } else {
            cursor.expect_keyword(Keyword::Default)?;
            ForeignKeyAction::SetDefault
        };
        if cursor.check(&TokenKind::LeftParen) {
            cursor.name_list()?;
        }
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_index() {
        let index = parse_index("CREATE INDEX candidates_name ON candidates (name)").unwrap();
        assert_eq!(index.name, "candidates_name");
        assert_eq!(index.table, "candidates");
        assert_eq!(index.columns, vec!["name"]);
        assert_eq!(index.expr, None);
        assert!(!index.unique);
    }

    #[test]
    fn catalog_indexdef() {
        let index = parse_index(
            "CREATE UNIQUE INDEX users_email_key ON public.users USING btree (email DESC NULLS LAST)",
        )
        .unwrap();
        assert!(index.unique);
        assert_eq!(index.table, "users");
        assert_eq!(index.method.as_deref(), Some("btree"));
        assert_eq!(index.columns, vec!["email"]);
    }

    #[test]
    fn functional_index() {
        let index =
            parse_index("CREATE INDEX trades_years ON trades (date_part('year'::text, opendate))")
                .unwrap();
        assert_eq!(index.columns, vec!["opendate"]);
        assert_eq!(
            index.expr.as_deref(),
            Some("date_part('year' :: text, opendate")
        );
    }

    #[test]
    fn two_column_functional_index() {
        let index = parse_index(
            "CREATE INDEX trades_years ON trades (year, date_part('year'::text, opendate))",
        )
        .unwrap();
        assert_eq!(index.columns, vec!["year", "opendate"]);
    }

    #[test]
    fn partial_index_with_options() {
        let index = parse_index(
            "CREATE UNIQUE INDEX IF NOT EXISTS live_orders ON orders USING btree (lower(code)) \
             INCLUDE (total) WITH (fillfactor = 70) WHERE deleted_at IS NULL;",
        )
        .unwrap();
        assert_eq!(index.columns, vec!["code"]);
        assert_eq!(index.expr.as_deref(), Some("lower(code"));
        assert_eq!(index.where_clause.as_deref(), Some("deleted_at IS NULL"));
    }

    #[test]
    fn foreign_key_constraint() {
        let index = parse_index(
            "ALTER TABLE orders ADD CONSTRAINT orders_user_fk FOREIGN KEY (user_id) \
             REFERENCES users(id) ON UPDATE CASCADE ON DELETE SET NULL",
        )
        .unwrap();
        assert!(index.constraint);
        assert_eq!(index.columns, vec!["user_id"]);
        let foreign = index.foreign.unwrap();
        assert_eq!(foreign.table, "users");
        assert_eq!(foreign.columns, vec!["id"]);
        assert_eq!(foreign.on_update, ForeignKeyAction::Cascade);
        assert_eq!(foreign.on_delete, ForeignKeyAction::SetNull);
    }

    #[test]
    fn unique_constraint_and_rejects() {
        let index =
            parse_index("ALTER TABLE users ADD CONSTRAINT users_email_uq UNIQUE (email)").unwrap();
        assert!(index.unique && index.constraint);
        assert!(parse_index("ALTER TABLE users ADD COLUMN x int").is_err());
        assert!(parse_index("CREATE TABLE t (a int)").is_err());
    }
}
