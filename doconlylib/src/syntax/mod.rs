//! Lossless syntax tree for Python source.
//!
//! Built on rowan's green/red trees. Whitespace, newlines and comments are
//! explicit tokens, so `parse_module(source)?.text() == source` always holds.
//!
//! ## Layout
//!
//! - Blank and comment-only lines are `EmptyLine` nodes. Those before the
//!   first statement are the module header; those before any other statement
//!   are its leading lines (the first children of the statement node).
//! - The end of a logical line is a `TrailingWhitespace` node.
//! - Indentation is a `Whitespace` token at the start of the statement.
//!
//! Expressions are kept as flat token runs; [`parse_module`] checks them
//! against the full grammar with tree-sitter before building the tree.

mod kind;
mod lexer;
mod parser;
mod validate;

pub use kind::{PythonLanguage, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken};
pub use lexer::{tokenize, Token};
pub use parser::parse_module;
pub use validate::validate;

/// The `EmptyLine` children that open a statement, or a module's header.
pub fn leading_lines(node: &SyntaxNode) -> impl Iterator<Item = SyntaxNode> {
    node.children()
        .take_while(|child| child.kind() == SyntaxKind::EmptyLine)
}
