//! Docstring-only detection by stripping docstrings and comparing trees.
//!
//! The scopes of both trees are paired in preorder. When both versions of a
//! scope have a docstring, the two docstring expressions are removed and
//! everything around them stays. When only one has a docstring, its line is
//! dropped and the formatting next to it is normalised on both sides: the
//! module header, the dropped line and the leading lines of the statement
//! that follows collapse into bare comment lines opening that statement. A
//! docstring sharing its line with other statements is cut out of the line
//! together with its `;` separator.

use std::collections::{HashMap, HashSet};

use rowan::{GreenNodeBuilder, NodeOrToken};

use crate::syntax::{
    leading_lines, parse_module, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken,
};
use crate::Result;

use super::locator::{locate_docstring, DocLocation};

/// Check whether `before` and `after` are equal once their docstrings are removed.
pub fn is_docstring_only_stripped(before: &str, after: &str) -> Result<bool> {
    let before = parse_module(before)?;
    let after = parse_module(after)?;
    let (before, after) = strip_docstring_pair(&before, &after);
    Ok(deep_eq(&before, &after))
}

/// Rebuild `root` without the docstring of any module, class or function.
///
/// Every docstring is treated as removed: the formatting around it is
/// normalised as if the other version of the scope had none.
pub fn strip_docstrings(root: &SyntaxNode) -> SyntaxNode {
    let mut plan = StripPlan::default();
    for scope in scopes(root) {
        plan.remove_one_sided(&scope, &locate_docstring(&scope));
    }
    plan.apply(root)
}

/// Strip two versions of a file, normalising each scope according to which
/// sides have a docstring.
pub fn strip_docstring_pair(before: &SyntaxNode, after: &SyntaxNode) -> (SyntaxNode, SyntaxNode) {
    let mut before_plan = StripPlan::default();
    let mut after_plan = StripPlan::default();

    for (b, a) in scopes(before).zip(scopes(after)) {
        let b_location = locate_docstring(&b);
        let a_location = locate_docstring(&a);
        match (b_location.has_docstring(), a_location.has_docstring()) {
            (true, true) => {
                before_plan.remove_expr(&b_location);
                after_plan.remove_expr(&a_location);
            }
            (true, false) => {
                let dropped = before_plan.remove_one_sided(&b, &b_location);
                after_plan.collapse_counterpart(&a, dropped);
            }
            (false, true) => {
                let dropped = after_plan.remove_one_sided(&a, &a_location);
                before_plan.collapse_counterpart(&b, dropped);
            }
            (false, false) => {}
        }
    }

    (before_plan.apply(before), after_plan.apply(after))
}

/// Structural equality: same kinds, same token text, same shape.
pub fn deep_eq(before: &SyntaxNode, after: &SyntaxNode) -> bool {
    if before.kind() != after.kind() {
        return false;
    }
    let mut b = before.children_with_tokens();
    let mut a = after.children_with_tokens();
    loop {
        match (b.next(), a.next()) {
            (None, None) => return true,
            (Some(NodeOrToken::Node(b)), Some(NodeOrToken::Node(a))) => {
                if !deep_eq(&b, &a) {
                    return false;
                }
            }
            (Some(NodeOrToken::Token(b)), Some(NodeOrToken::Token(a))) => {
                if b.kind() != a.kind() || b.text() != a.text() {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

fn scopes(root: &SyntaxNode) -> impl Iterator<Item = SyntaxNode> {
    root.descendants().filter(|node| node.kind().is_scope())
}

/// What to remove from one tree.
#[derive(Debug, Default)]
struct StripPlan {
    /// Docstring expressions removed on their own.
    exprs: HashSet<SyntaxNode>,
    /// Docstring expressions cut out of a line that stays.
    inline: HashSet<SyntaxNode>,
    /// Docstring lines dropped whole, with their expression.
    lines: HashMap<SyntaxNode, SyntaxNode>,
    /// Bodies whose opening formatting collapses into comment lines.
    collapsed: HashSet<SyntaxNode>,
}

impl StripPlan {
    fn remove_expr(&mut self, location: &DocLocation) {
        if let Some(expr) = location.expr() {
            self.exprs.insert(expr.clone());
        }
    }

    /// Remove a docstring the other version does not have.
    ///
    /// Returns whether its whole line is dropped.
    fn remove_one_sided(&mut self, scope: &SyntaxNode, location: &DocLocation) -> bool {
        let DocLocation::Docstring { container, expr } = location else {
            return false;
        };
        if container.kind() == SyntaxKind::SimpleStatementLine && !location.is_inline() {
            self.lines.insert(container.clone(), expr.clone());
            if let Some(body) = container.parent() {
                self.collapsed.insert(body);
            }
            return true;
        }
        self.inline.insert(expr.clone());
        if scope.kind() == SyntaxKind::Module {
            self.collapsed.insert(scope.clone());
        }
        false
    }

    /// Normalise a scope whose other version has the only docstring.
    fn collapse_counterpart(&mut self, scope: &SyntaxNode, line_dropped: bool) {
        if scope.kind() == SyntaxKind::Module {
            self.collapsed.insert(scope.clone());
        } else if line_dropped {
            if let Some(block) = scope
                .children()
                .find(|child| child.kind() == SyntaxKind::IndentedBlock)
            {
                self.collapsed.insert(block);
            }
        }
    }

    fn apply(&self, root: &SyntaxNode) -> SyntaxNode {
        let mut stripper = Stripper {
            plan: self,
            builder: GreenNodeBuilder::new(),
        };
        stripper.node(root);
        SyntaxNode::new_root(stripper.builder.finish())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    None,
    BeforeSemicolon,
    AfterSemicolon,
}

struct Stripper<'p> {
    plan: &'p StripPlan,
    builder: GreenNodeBuilder<'static>,
}

impl Stripper<'_> {
    fn node(&mut self, node: &SyntaxNode) {
        if self.plan.collapsed.contains(node) {
            self.collapsed_body(node);
            return;
        }
        self.builder.start_node(node.kind().into());
        self.children(node.children_with_tokens());
        self.builder.finish_node();
    }

    fn children(&mut self, children: impl Iterator<Item = SyntaxElement>) {
        let mut separator = Separator::None;
        for child in children {
            match child {
                NodeOrToken::Node(child) => {
                    if self.plan.exprs.contains(&child) {
                        continue;
                    }
                    if self.plan.inline.contains(&child) {
                        separator = Separator::BeforeSemicolon;
                        continue;
                    }
                    separator = Separator::None;
                    self.node(&child);
                }
                NodeOrToken::Token(token) => {
                    match (separator, token.kind()) {
                        (Separator::None, _) => {}
                        (_, SyntaxKind::Whitespace) => continue,
                        (Separator::BeforeSemicolon, SyntaxKind::Semicolon) => {
                            separator = Separator::AfterSemicolon;
                            continue;
                        }
                        _ => separator = Separator::None,
                    }
                    self.builder.token(token.kind().into(), token.text());
                }
            }
        }
    }

    /// Copy a body, collapsing the formatting up to its first kept statement.
    fn collapsed_body(&mut self, body: &SyntaxNode) {
        self.builder.start_node(body.kind().into());
        let is_module = body.kind() == SyntaxKind::Module;
        let mut comments: Vec<SyntaxToken> = Vec::new();
        let mut collapsing = true;

        for child in body.children_with_tokens() {
            let NodeOrToken::Node(node) = child else {
                self.children(std::iter::once(child));
                continue;
            };
            if !collapsing {
                self.node(&node);
            } else if is_module && node.kind() == SyntaxKind::EmptyLine {
                comments.extend(comments_outside(&node, None));
            } else if let Some(expr) = self.plan.lines.get(&node) {
                tracing::trace!(offset = ?node.text_range().start(), "dropping docstring line");
                comments.extend(comments_outside(&node, Some(expr)));
            } else if node.kind().is_statement() {
                collapsing = false;
                self.statement(&node, std::mem::take(&mut comments));
            } else {
                self.node(&node);
            }
        }

        self.comment_lines(&comments);
        self.builder.finish_node();
    }

    /// Copy a statement whose leading lines are replaced by `comments` and
    /// the comments of those lines.
    fn statement(&mut self, statement: &SyntaxNode, mut comments: Vec<SyntaxToken>) {
        for line in leading_lines(statement) {
            comments.extend(comments_outside(&line, None));
        }
        self.builder.start_node(statement.kind().into());
        self.comment_lines(&comments);
        self.children(
            statement
                .children_with_tokens()
                .skip_while(|child| child.kind() == SyntaxKind::EmptyLine),
        );
        self.builder.finish_node();
    }

    fn comment_lines(&mut self, comments: &[SyntaxToken]) {
        for comment in comments {
            self.builder.start_node(SyntaxKind::EmptyLine.into());
            self.builder.token(SyntaxKind::Comment.into(), comment.text());
            self.builder.token(SyntaxKind::Newline.into(), "\n");
            self.builder.finish_node();
        }
    }
}

/// Comment tokens under `node`, except those inside `skip`.
fn comments_outside(node: &SyntaxNode, skip: Option<&SyntaxNode>) -> Vec<SyntaxToken> {
    let inside = |token: &SyntaxToken| {
        skip.is_some_and(|skip| skip.text_range().contains_range(token.text_range()))
    };
    node.descendants_with_tokens()
        .filter_map(SyntaxElement::into_token)
        .filter(|token| token.kind() == SyntaxKind::Comment && !inside(token))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::comparator::is_docstring_only;
    use crate::data::locator::locate_all;

    const MODULE: &str = r#"#!/usr/bin/env python
# -*- coding: utf-8 -*-
"""Module."""

import os


class A:
    """A.

    More.
    """

    x = 1

    def f(self):
        # why
        '''f.'''
        return self.x

    @property
    def g(self):
        """g."""  # trailing

        return 2
"#;

    const NESTED: &str = r#"def outer():
    'outer'
    def inner():
        ('in'
         'ner')
        pass

    return inner
"#;

    fn stripped(source: &str) -> String {
        strip_docstrings(&parse_module(source).unwrap()).to_string()
    }

    fn agree(before: &str, after: &str) -> bool {
        let lockstep = is_docstring_only(before, after).unwrap();
        let stripped = is_docstring_only_stripped(before, after).unwrap();
        assert_eq!(lockstep, stripped, "{before:?} vs {after:?}");
        lockstep
    }

    /// Copies of `source` with one docstring line removed, alone and with a
    /// blank line left in its place. Its leading lines stay.
    fn removals(source: &str) -> Vec<(String, bool)> {
        let tree = parse_module(source).unwrap();
        let mut out = Vec::new();
        for location in locate_all(&tree).into_values() {
            let DocLocation::Docstring { container, .. } = &location else {
                continue;
            };
            if container.kind() != SyntaxKind::SimpleStatementLine || location.is_inline() {
                continue;
            }
            let Some(first) = container
                .children_with_tokens()
                .find(|child| child.kind() != SyntaxKind::EmptyLine)
            else {
                continue;
            };
            let start = usize::from(first.text_range().start());
            let end = usize::from(container.text_range().end());
            let keeps_comments = !source[start..end].contains('#');
            for gap in ["", "\n"] {
                let removed = format!("{}{}{}", &source[..start], gap, &source[end..]);
                if parse_module(&removed).is_ok() {
                    out.push((removed, keeps_comments));
                }
            }
        }
        out
    }

    #[test]
    fn test_strip_module_docstring() {
        assert_eq!(stripped("\"\"\"Doc.\"\"\"\nx = 1\n"), "x = 1\n");
        assert_eq!(stripped("# header\n\n'doc'\n"), "# header\n");
        assert_eq!(stripped("# header\n'doc'\n\n\nimport os\n"), "# header\nimport os\n");
    }

    #[test]
    fn test_strip_collapses_comment_lines() {
        assert_eq!(
            stripped("def f():\n    # note\n    'doc'\n\n    return 1\n"),
            "def f():\n# note\n    return 1\n"
        );
        assert_eq!(stripped("def f():\n    # note\n    'doc'\n"), "def f():\n# note\n");
    }

    #[test]
    fn test_strip_inline_docstring() {
        assert_eq!(stripped("class A: 'doc'; x = 1\n"), "class A: x = 1\n");
        assert_eq!(stripped("'doc' ; x = 1\n"), "x = 1\n");
        assert_eq!(stripped("class A: 'doc'\n"), "class A: \n");
    }

    #[test]
    fn test_strip_moves_trailing_comment() {
        assert_eq!(stripped("'doc'  # keep\n\nx\n"), "# keep\nx\n");
    }

    #[test]
    fn test_strip_nested_scopes() {
        let source = "'m'\nclass A:\n    'a'\n    def f(self):\n        'f'\n        pass\n";
        assert_eq!(stripped(source), "class A:\n    def f(self):\n        pass\n");
    }

    #[test]
    fn test_strip_ignores_non_docstrings() {
        let source = "x = 1\n'late'\nf'{x}'\n";
        assert_eq!(stripped(source), source);
    }

    #[test]
    fn test_pair_keeps_formatting_around_shared_docstrings() {
        let before = parse_module("def f():\n    'a'\n\n    return 1\n").unwrap();
        let after = parse_module("def f():\n    'b'\n\n    return 1\n").unwrap();
        let (before, after) = strip_docstring_pair(&before, &after);
        assert_eq!(before.to_string(), "def f():\n    \n\n    return 1\n");
        assert!(deep_eq(&before, &after));
    }

    #[test]
    fn test_deep_eq() {
        let a = parse_module("x = 1\n").unwrap();
        let b = parse_module("x = 1\n").unwrap();
        let c = parse_module("x = 2\n").unwrap();
        let d = parse_module("x = 1\ny\n").unwrap();
        assert!(deep_eq(&a, &b));
        assert!(!deep_eq(&a, &c));
        assert!(!deep_eq(&a, &d));
    }

    #[test]
    fn test_stripped_verdicts() {
        assert!(!is_docstring_only_stripped("x = 1", "x = 2").unwrap());
        assert!(is_docstring_only_stripped("'a'\nx = 1\n", "'b'\nx = 1\n").unwrap());
        assert!(!is_docstring_only_stripped("'a'\nx = 1\n", "'b'\nx = 2\n").unwrap());
        assert!(is_docstring_only_stripped(
            "def f():\n    'a'\n    return 1\n",
            "def f():\n    return 1\n"
        )
        .unwrap());
        assert!(is_docstring_only_stripped("x = (", "x = 1").is_err());
    }

    #[test]
    fn test_formulations_agree() {
        let cases = [
            ("x = 1", "x = 2"),
            ("\"\"\"Module.\"\"\"\nx = 1\n", "\"\"\"Revised.\"\"\"\nx = 1\n"),
            ("\"\"\"Module.\"\"\"\nx = 1\n", "\"\"\"Revised.\"\"\"\nx = 2\n"),
            (
                "def f():\n    \"\"\"Doc.\"\"\"\n    return 1\n",
                "def f():\n    return 1\n",
            ),
            (
                "class A:\n    # old comment\n    pass\n",
                "class A:\n    \"\"\"Doc.\"\"\"\n    # new comment\n    pass\n",
            ),
            ("# header\n'doc'\nimport os\n", "# header\nimport os\n"),
            ("class A: 'doc'; x = 1\n", "class A: x = 1\n"),
            ("'a' 'b'\nx\n", "('c')\nx\n"),
            ("'doc'\n", ""),
            ("", "'doc'\n"),
            ("'doc'\n\n# tail\n", "# tail\n"),
            ("'doc'\n\n# tail\n", "# other\n"),
            ("x = 1\n'not a docstring'\n", "x = 1\n'changed'\n"),
            (
                "def f():\n    'doc'\n    return 1\n",
                "def f():\n    'doc'\n    return 2\n",
            ),
            (
                "def f():\n    'a'\n    return 1\n",
                "def f():\n    'b'\n\n    return 1\n",
            ),
            (
                "def f():\n    'a'  # note\n    return 1\n",
                "def f():\n    return 1\n",
            ),
            (
                "def f():\n    'a'  # note\n    return 1\n",
                "def f():\n    # note\n    return 1\n",
            ),
            ("def f():\n    x\n", "def f():\n\n    x\n"),
            ("f'a'\n", "f'b'\n"),
        ];
        for (before, after) in cases {
            agree(before, after);
        }
    }

    #[test]
    fn test_blank_lines_around_removed_docstring() {
        let cases = [
            ("class A:\n    \"\"\"d\"\"\"\n\n    x = 1\n", "class A:\n    x = 1\n"),
            ("class A:\n    x = 1\n", "class A:\n\n    \"\"\"d\"\"\"\n\n\n    x = 1\n"),
            ("\"\"\"Doc.\"\"\"\n\n\nimport os\n", "import os\n"),
            (
                "#!/usr/bin/env python\n\n\"\"\"Doc.\"\"\"\nimport os\n",
                "#!/usr/bin/env python\nimport os\n",
            ),
            (
                "def f():\n    'd'\n\n    # why\n    return 1\n",
                "def f():\n    # why\n\n    return 1\n",
            ),
            (
                "'m'\n\nclass A:\n    'a'\n\n    def f(self):\n        pass\n",
                "class A:\n\n    def f(self):\n        pass\n",
            ),
        ];
        for (before, after) in cases {
            assert!(agree(before, after), "{before:?} vs {after:?}");
            assert!(agree(after, before), "{after:?} vs {before:?}");
        }
    }

    #[test]
    fn test_removal_pairs_agree() {
        let sources = [
            MODULE,
            "'''Only a docstring.'''\n\n# footer\n",
            NESTED,
        ];
        for source in sources {
            for (removed, keeps_comments) in removals(source) {
                let verdict = agree(source, &removed);
                assert_eq!(agree(&removed, source), verdict);
                if keeps_comments {
                    assert!(verdict, "{source:?} vs {removed:?}");
                }
            }
        }
    }
}
