//! Routine headers in a function file.

use super::cursor::{split_top_level, Cursor};
use super::render::render;
use crate::lexer::{Keyword, Token, TokenKind};
use crate::schema::{Routine, RoutineKind};

/// Every `CREATE [OR REPLACE] FUNCTION|PROCEDURE name(args)` header in
/// `text`, in file order. Argument defaults are cut so the result is a
/// valid `DROP` signature.
#[must_use]
pub fn routine_headers(text: &str) -> Vec<Routine> {
    let mut cursor = Cursor::new(text);
    let mut routines = Vec::new();
    while !cursor.current().is_eof() {
        if !cursor.eat_keyword(Keyword::Create) {
            cursor.advance();
            continue;
        }
        if let Some(routine) = header(&mut cursor) {
            routines.push(routine);
        }
    }
    routines
}

/// Everything after `CREATE`. Leaves the cursor wherever matching stopped.
fn header(cursor: &mut Cursor<'_>) -> Option<Routine> {
    if cursor.eat_keyword(Keyword::Or) && !cursor.eat_keyword(Keyword::Replace) {
        return None;
    }
    let kind = if cursor.eat_keyword(Keyword::Function) {
        RoutineKind::Function
    } else if cursor.eat_keyword(Keyword::Procedure) {
        RoutineKind::Procedure
    } else {
        return None;
    };
    let name = cursor.expect_object_name().ok()?;
    let src = cursor.src();
    let start = cursor.position();
    let ranges = cursor.parenthesized().ok()?;
    let end = ranges.last().map_or(start, |r| r.end);
    let inner = cursor.tokens(start + 1..end.max(start + 1));

    let arguments = split_top_level(inner)
        .into_iter()
        .map(|arg| render(src, without_default(arg)))
        .filter(|arg| !arg.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    Some(Routine::new(name, kind, arguments))
}

fn without_default(arg: &[Token]) -> &[Token] {
    let mut depth = 0usize;
    for (i, token) in arg.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket => depth = depth.saturating_sub(1),
            TokenKind::Eq if depth == 0 => return &arg[..i],
            TokenKind::Keyword(Keyword::Default) if depth == 0 => return &arg[..i],
            _ => {}
        }
    }
    arg
}
