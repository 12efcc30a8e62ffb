//! Skipping docstrings and formatting during the lockstep walk.
//!
//! Comments are never dropped: every comment met while skipping is handed
//! back through `deferred` so it can be compared later.

use crate::error::DoconlyError;
use crate::syntax::{leading_lines, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken};
use crate::Result;

use super::sequence::{flatten, NodeCursor};

/// Skip a docstring statement that sits on a line of its own.
///
/// The cursor must be positioned inside the docstring's container, before
/// `expr`. Skips the expression subtree and the formatting around it and
/// returns the first element that is neither, or `None` at the end of the
/// sequence.
pub fn consume_docstring(
    cursor: &mut NodeCursor,
    expr: &SyntaxNode,
    deferred: &mut Vec<SyntaxElement>,
) -> Result<Option<SyntaxElement>> {
    let expr_element = SyntaxElement::Node(expr.clone());
    let mut seen = false;

    while let Some(element) = cursor.next() {
        if element == expr_element {
            skip_expression(cursor, expr)?;
            seen = true;
            continue;
        }
        match element.kind() {
            kind if kind.is_formatting() => {}
            SyntaxKind::Semicolon if seen => {}
            SyntaxKind::Comment => deferred.push(element),
            kind if seen => {
                tracing::trace!(?kind, "docstring consumed");
                return Ok(Some(element));
            }
            kind => {
                return Err(DoconlyError::invariant(format!(
                    "unexpected {:?} before the docstring",
                    kind
                )))
            }
        }
    }

    if seen {
        Ok(None)
    } else {
        Err(DoconlyError::invariant(
            "ran out of nodes before reaching the docstring",
        ))
    }
}

/// Skip a docstring that shares its line with other statements.
///
/// Called right after the cursor yielded `expr`. Skips the expression
/// subtree and the `;` separating it from the next statement, and returns
/// the element that follows.
pub fn consume_inline_docstring(
    cursor: &mut NodeCursor,
    expr: &SyntaxNode,
) -> Result<Option<SyntaxElement>> {
    skip_expression(cursor, expr)?;

    let mut separator_seen = false;
    for element in cursor.by_ref() {
        match element.kind() {
            SyntaxKind::Whitespace => {}
            SyntaxKind::Semicolon if !separator_seen => separator_seen = true,
            _ => return Ok(Some(element)),
        }
    }
    Ok(None)
}

/// Skip the rest of an expression subtree whose first element was `first`.
pub fn skip_rest_of_expression(
    cursor: &mut NodeCursor,
    expr: &SyntaxNode,
    first: &SyntaxElement,
) -> Result<()> {
    let last = last_token(expr)?;
    if matches!(first, SyntaxElement::Token(token) if *token == last) {
        return Ok(());
    }
    skip_through(cursor, &last)
}

/// Consume the leading lines of `statement` (the header, for a module).
///
/// Every element of those lines must come next in the cursor.
pub fn consume_leading_lines(
    cursor: &mut NodeCursor,
    statement: &SyntaxNode,
    deferred: &mut Vec<SyntaxElement>,
) -> Result<()> {
    for line in leading_lines(statement) {
        for expected in flatten(&line) {
            match cursor.next() {
                Some(found) if found == expected => {}
                _ => {
                    return Err(DoconlyError::invariant(
                        "expected leading line is missing",
                    ))
                }
            }
            if expected.kind() == SyntaxKind::Comment {
                deferred.push(expected);
            }
        }
    }
    Ok(())
}

/// Skip the descendants of `expr`, whose node was just read.
fn skip_expression(cursor: &mut NodeCursor, expr: &SyntaxNode) -> Result<()> {
    let last = last_token(expr)?;
    skip_through(cursor, &last)
}

fn skip_through(cursor: &mut NodeCursor, last: &SyntaxToken) -> Result<()> {
    for element in cursor.by_ref() {
        if matches!(&element, SyntaxElement::Token(token) if token == last) {
            return Ok(());
        }
    }
    Err(DoconlyError::invariant(
        "ran out of nodes while skipping a docstring",
    ))
}

fn last_token(expr: &SyntaxNode) -> Result<SyntaxToken> {
    expr.last_token()
        .ok_or_else(|| DoconlyError::invariant("docstring expression has no tokens"))
}
