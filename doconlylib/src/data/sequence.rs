//! Preorder flattening of a syntax tree and a cursor with push-back.
//!
//! Comparing two flattened trees element by element, with each element
//! compared only by its own kind and text, is equivalent to comparing the
//! trees recursively: children show up later in the sequence as their own
//! elements.

use std::collections::VecDeque;

use rowan::WalkEvent;

use crate::syntax::{SyntaxElement, SyntaxNode};

/// Every node and token of `root` in preorder, `root` included.
pub fn flatten(root: &SyntaxNode) -> Vec<SyntaxElement> {
    root.preorder_with_tokens()
        .filter_map(|event| match event {
            WalkEvent::Enter(element) => Some(element),
            WalkEvent::Leave(_) => None,
        })
        .collect()
}

/// Compare a single element without looking at its children.
pub fn shallow_eq(before: &SyntaxElement, after: &SyntaxElement) -> bool {
    match (before, after) {
        (SyntaxElement::Node(b), SyntaxElement::Node(a)) => b.kind() == a.kind(),
        (SyntaxElement::Token(b), SyntaxElement::Token(a)) => {
            b.kind() == a.kind() && b.text() == a.text()
        }
        _ => false,
    }
}

/// Forward cursor over a flattened sequence.
///
/// Elements pushed back are yielded before the rest of the sequence.
#[derive(Debug)]
pub struct NodeCursor {
    elements: Vec<SyntaxElement>,
    index: usize,
    pushed: VecDeque<SyntaxElement>,
}

impl NodeCursor {
    pub fn new(elements: Vec<SyntaxElement>) -> Self {
        Self {
            elements,
            index: 0,
            pushed: VecDeque::new(),
        }
    }

    pub fn from_tree(root: &SyntaxNode) -> Self {
        Self::new(flatten(root))
    }

    /// Re-inject an element so it is yielded next.
    pub fn push_front(&mut self, element: SyntaxElement) {
        self.pushed.push_front(element);
    }

    /// Queue elements to be yielded after those already pushed back.
    pub fn push_back_all(&mut self, elements: impl IntoIterator<Item = SyntaxElement>) {
        self.pushed.extend(elements);
    }
}

impl Iterator for NodeCursor {
    type Item = SyntaxElement;

    fn next(&mut self) -> Option<SyntaxElement> {
        if let Some(element) = self.pushed.pop_front() {
            return Some(element);
        }
        let element = self.elements.get(self.index).cloned()?;
        self.index += 1;
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_module, SyntaxKind};

    fn kinds(elements: &[SyntaxElement]) -> Vec<SyntaxKind> {
        elements.iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_flatten_preorder() {
        let tree = parse_module("x = 1\n").unwrap();
        let elements = flatten(&tree);
        assert_eq!(
            kinds(&elements),
            vec![
                SyntaxKind::Module,
                SyntaxKind::SimpleStatementLine,
                SyntaxKind::SmallStmt,
                SyntaxKind::Name,
                SyntaxKind::Whitespace,
                SyntaxKind::Eq,
                SyntaxKind::Whitespace,
                SyntaxKind::Number,
                SyntaxKind::TrailingWhitespace,
                SyntaxKind::Newline,
            ]
        );
    }

    #[test]
    fn test_shallow_eq_ignores_children() {
        let before = flatten(&parse_module("x = 1\n").unwrap());
        let after = flatten(&parse_module("x = 2\n").unwrap());
        assert!(shallow_eq(&before[1], &after[1]));
        assert!(shallow_eq(&before[3], &after[3]));
        assert!(!shallow_eq(&before[7], &after[7]));
        assert!(!shallow_eq(&before[1], &after[3]));
    }

    #[test]
    fn test_cursor_push_back() {
        let tree = parse_module("x\n").unwrap();
        let mut cursor = NodeCursor::from_tree(&tree);
        let module = cursor.next().unwrap();
        let line = cursor.next().unwrap();

        cursor.push_front(line.clone());
        cursor.push_front(module.clone());
        assert_eq!(cursor.next(), Some(module));
        assert_eq!(cursor.next(), Some(line));
        assert_eq!(cursor.next().map(|e| e.kind()), Some(SyntaxKind::ExprStmt));
    }

    #[test]
    fn test_cursor_push_back_all_keeps_order() {
        let tree = parse_module("a\n").unwrap();
        let elements = flatten(&tree);
        let mut cursor = NodeCursor::new(Vec::new());
        cursor.push_back_all(elements.iter().take(2).cloned());
        assert_eq!(cursor.next(), Some(elements[0].clone()));
        assert_eq!(cursor.next(), Some(elements[1].clone()));
        assert_eq!(cursor.next(), None);
    }
}
