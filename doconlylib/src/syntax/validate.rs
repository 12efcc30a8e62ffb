//! Grammar check of the full Python language.
//!
//! The rowan parser only structures statements and lines; expressions are
//! kept as flat token runs. tree-sitter-python checks every input against
//! the complete grammar before it is compared.

use tree_sitter::{Node, Parser};

use crate::error::DoconlyError;
use crate::Result;

use super::lexer::error_at;

const BOM: char = '\u{feff}';

/// Reject `source` unless it is valid Python 3.
pub fn validate(source: &str) -> Result<()> {
    let (skipped, text) = match source.strip_prefix(BOM) {
        Some(rest) => (BOM.len_utf8(), rest),
        None => (0, source),
    };

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| DoconlyError::invariant(format!("failed to load Python grammar: {}", e)))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| DoconlyError::invariant("tree-sitter returned no tree"))?;

    match first_invalid(tree.root_node(), text) {
        Some((offset, message)) => Err(error_at(source, skipped + offset, message)),
        None => Ok(()),
    }
}

/// Offset and description of the first invalid construct, in preorder.
fn first_invalid(root: Node<'_>, text: &str) -> Option<(usize, String)> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if let Some(message) = invalid(node, text) {
            return Some((node.start_byte(), message));
        }
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn invalid(node: Node<'_>, text: &str) -> Option<String> {
    if node.is_missing() {
        return Some(format!("invalid syntax: expected '{}'", node.kind()));
    }
    if node.is_error() {
        return Some("invalid syntax".to_string());
    }
    match node.kind() {
        // The grammar still accepts these Python 2 forms.
        "print_statement" => Some("Missing parentheses in call to 'print'".to_string()),
        "exec_statement" => Some("Missing parentheses in call to 'exec'".to_string()),
        "<>" if !node.is_named() => Some("invalid syntax: '<>'".to_string()),
        "integer" => node
            .utf8_text(text.as_bytes())
            .ok()
            .and_then(legacy_integer),
        _ => None,
    }
}

/// Python 2 integer spellings: `0777` octals and `L` suffixes.
fn legacy_integer(literal: &str) -> Option<String> {
    let digits = literal.replace('_', "");
    if digits.ends_with(|c: char| matches!(c, 'l' | 'L')) {
        return Some("invalid decimal literal".to_string());
    }
    let lower = digits.to_ascii_lowercase();
    if lower.ends_with('j') || ["0x", "0o", "0b"].iter().any(|p| lower.starts_with(p)) {
        return None;
    }
    if lower.starts_with('0') && lower.chars().any(|c| c != '0') {
        return Some(
            "leading zeros in decimal integer literals are not permitted; \
             use an 0o prefix for octal integers"
                .to_string(),
        );
    }
    None
}
