//! Docstring discovery for modules, classes and functions.

use std::collections::HashMap;

use crate::syntax::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken};

/// Where the docstring of a scope lives, if it has one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocLocation {
    NoDocstring,
    Docstring {
        /// The statement line or simple suite directly holding `expr`.
        container: SyntaxNode,
        /// The expression statement holding the string literal.
        expr: SyntaxNode,
    },
}

impl DocLocation {
    pub fn has_docstring(&self) -> bool {
        matches!(self, DocLocation::Docstring { .. })
    }

    pub fn container(&self) -> Option<&SyntaxNode> {
        match self {
            DocLocation::Docstring { container, .. } => Some(container),
            DocLocation::NoDocstring => None,
        }
    }

    pub fn expr(&self) -> Option<&SyntaxNode> {
        match self {
            DocLocation::Docstring { expr, .. } => Some(expr),
            DocLocation::NoDocstring => None,
        }
    }

    /// The docstring is followed by other statements on its line.
    pub fn is_inline(&self) -> bool {
        let DocLocation::Docstring { container, expr } = self else {
            return false;
        };
        container
            .children()
            .skip_while(|child| child != expr)
            .skip(1)
            .any(|child| matches!(child.kind(), SyntaxKind::ExprStmt | SyntaxKind::SmallStmt))
    }
}

/// Find the docstring of a module, class or function node.
///
/// Any other node kind has no docstring.
pub fn locate_docstring(scope: &SyntaxNode) -> DocLocation {
    let first = match scope.kind() {
        SyntaxKind::Module => first_statement(scope),
        SyntaxKind::ClassDef | SyntaxKind::FunctionDef => scope
            .children()
            .find(|child| child.kind().is_suite()),
        _ => None,
    };
    let Some(mut current) = first else {
        return DocLocation::NoDocstring;
    };

    let mut container = current.clone();
    while current.kind().is_suite() {
        let Some(next) = first_statement(&current) else {
            return DocLocation::NoDocstring;
        };
        container = current;
        current = next;
    }

    if current.kind() == SyntaxKind::ExprStmt && is_string_value(&current) {
        DocLocation::Docstring {
            container,
            expr: current,
        }
    } else {
        DocLocation::NoDocstring
    }
}

/// Docstring locations of every scope in the tree.
pub fn locate_all(root: &SyntaxNode) -> HashMap<SyntaxNode, DocLocation> {
    root.descendants()
        .filter(|node| node.kind().is_scope())
        .map(|node| {
            let location = locate_docstring(&node);
            (node, location)
        })
        .collect()
}

/// First statement-like child, skipping blank lines and trailing whitespace.
fn first_statement(node: &SyntaxNode) -> Option<SyntaxNode> {
    node.children().find(|child| {
        !matches!(
            child.kind(),
            SyntaxKind::EmptyLine | SyntaxKind::TrailingWhitespace
        )
    })
}

/// A string literal whose value is known without evaluation.
///
/// Optional balanced parentheses may surround a single literal or a run of
/// adjacent literals. Formatted parts and bytes/str mixes disqualify it.
fn is_string_value(expr: &SyntaxNode) -> bool {
    let mut significant = expr
        .children_with_tokens()
        .filter(|element| !element.kind().is_trivia())
        .peekable();

    let mut open = 0usize;
    while significant
        .next_if(|element| element.kind() == SyntaxKind::LParen)
        .is_some()
    {
        open += 1;
    }

    let parts: Vec<SyntaxToken> = match significant.next() {
        Some(SyntaxElement::Token(token)) if token.kind() == SyntaxKind::String => vec![token],
        Some(SyntaxElement::Node(node)) if node.kind() == SyntaxKind::ConcatenatedString => node
            .children_with_tokens()
            .filter_map(SyntaxElement::into_token)
            .filter(|token| token.kind() == SyntaxKind::String)
            .collect(),
        _ => return false,
    };

    let mut close = 0usize;
    for element in significant {
        if element.kind() != SyntaxKind::RParen {
            return false;
        }
        close += 1;
    }
    if open != close {
        return false;
    }

    let mut prefixes = parts.iter().map(|token| string_prefix(token.text()));
    let Some(first) = prefixes.next() else {
        return false;
    };
    let is_bytes = first.contains('b');
    let all_static = parts
        .iter()
        .all(|token| !string_prefix(token.text()).contains(['f', 't']));
    all_static && prefixes.all(|prefix| prefix.contains('b') == is_bytes)
}

/// Lowercased prefix letters of a string literal.
fn string_prefix(literal: &str) -> String {
    literal
        .chars()
        .take_while(|c| *c != '"' && *c != '\'')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    fn module_doc(source: &str) -> DocLocation {
        let tree = parse_module(source).unwrap();
        locate_docstring(&tree)
    }

    fn first_def_doc(source: &str) -> DocLocation {
        let tree = parse_module(source).unwrap();
        let def = tree
            .descendants()
            .find(|n| matches!(n.kind(), SyntaxKind::FunctionDef | SyntaxKind::ClassDef))
            .unwrap();
        locate_docstring(&def)
    }

    #[test]
    fn test_module_docstring() {
        let location = module_doc("# header\n\n\"\"\"Doc.\"\"\"\nx = 1\n");
        let expr = location.expr().unwrap();
        assert_eq!(expr.text().to_string(), "\"\"\"Doc.\"\"\"");
        assert_eq!(
            location.container().unwrap().kind(),
            SyntaxKind::SimpleStatementLine
        );
    }

    #[test]
    fn test_no_docstring() {
        assert_eq!(module_doc("x = 1\n\"\"\"late\"\"\"\n"), DocLocation::NoDocstring);
        assert_eq!(module_doc(""), DocLocation::NoDocstring);
        assert_eq!(module_doc("# only a comment\n"), DocLocation::NoDocstring);
        assert_eq!(module_doc("'a' + 'b'\n"), DocLocation::NoDocstring);
    }

    #[test]
    fn test_function_docstring_in_block() {
        let location = first_def_doc("def f():\n    # c\n    'doc'\n    return 1\n");
        assert!(location.has_docstring());
        assert!(!location.is_inline());
        assert_eq!(
            location.container().unwrap().kind(),
            SyntaxKind::SimpleStatementLine
        );
    }

    #[test]
    fn test_docstring_in_simple_suite() {
        let location = first_def_doc("class A: 'doc'; x = 1\n");
        assert_eq!(
            location.container().unwrap().kind(),
            SyntaxKind::SimpleStatementSuite
        );
        assert!(location.is_inline());
        assert!(!first_def_doc("class A: 'doc'\n").is_inline());
    }

    #[test]
    fn test_concatenated_and_parenthesized() {
        assert!(module_doc("('a'\n 'b')\n").has_docstring());
        assert!(module_doc("r'a' u'b'\n").has_docstring());
        assert!(module_doc("((b'a' b'b'))\n").has_docstring());
    }

    #[test]
    fn test_formatted_strings_are_not_docstrings() {
        assert!(!module_doc("f'a'\n").has_docstring());
        assert!(!module_doc("'a' f'{b}'\n").has_docstring());
        assert!(!module_doc("'a' b'b'\n").has_docstring());
    }

    #[test]
    fn test_call_is_not_docstring() {
        assert!(!module_doc("('a')(1)\n").has_docstring());
        assert!(!module_doc("'a'.upper()\n").has_docstring());
    }

    #[test]
    fn test_locate_all_covers_every_scope() {
        let tree = parse_module(
            "'m'\nclass A:\n    def f(self):\n        'f'\n    def g(self):\n        pass\n",
        )
        .unwrap();
        let locations = locate_all(&tree);
        assert_eq!(locations.len(), 4);
        let with_doc = locations.values().filter(|l| l.has_docstring()).count();
        assert_eq!(with_doc, 2);
        assert!(locations[&tree].has_docstring());
    }
}
