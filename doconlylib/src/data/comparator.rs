//! Lockstep comparison of two syntax trees, modulo docstrings.
//!
//! Both trees are flattened in preorder and walked pairwise. Pairs must be
//! shallowly equal, except around docstrings:
//!
//! - When both sides of a scope have a docstring, the two docstring
//!   expressions are skipped without being compared.
//! - When only one side has one, that side's docstring is cut out together
//!   with the blank lines around it. The leading lines of the statements that
//!   follow are dropped on both sides, but their comments are compared.
//! - A module header is read before the docstring on one side and before the
//!   first statement on the other, so it is taken out of the walk on both
//!   sides and its comments are compared once the docstring is resolved.

use std::collections::HashMap;

use crate::error::DoconlyError;
use crate::syntax::{parse_module, SyntaxElement, SyntaxKind, SyntaxNode};
use crate::Result;

use super::consumer::{
    consume_docstring, consume_inline_docstring, consume_leading_lines, skip_rest_of_expression,
};
use super::locator::{locate_all, DocLocation};
use super::sequence::{shallow_eq, NodeCursor};

/// Check whether `before` and `after` differ only in their docstrings.
///
/// Returns `Ok(false)` for any other change, and an error when either text
/// does not parse.
///
/// # Example
///
/// ```rust
/// use doconlylib::is_docstring_only;
///
/// let before = "\"\"\"module docstring\"\"\"\nx = 1\n";
/// let after = "\"\"\"changed docstring\"\"\"\nx = 1\n";
/// assert!(is_docstring_only(before, after).unwrap());
/// assert!(!is_docstring_only("x = 1", "x = 2").unwrap());
/// ```
pub fn is_docstring_only(before: &str, after: &str) -> Result<bool> {
    let before = parse_module(before)?;
    let after = parse_module(after)?;
    compare_trees(&before, &after)
}

/// Same as [`is_docstring_only`], on trees that are already parsed.
pub fn compare_trees(before: &SyntaxNode, after: &SyntaxNode) -> Result<bool> {
    DocstringComparator::new(before, after).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
}

/// Walk state of one of the two trees.
struct SideTracker {
    cursor: NodeCursor,
    locations: HashMap<SyntaxNode, DocLocation>,
    location: DocLocation,
    /// Comments skipped while resolving a docstring, compared once it is resolved.
    deferred: Vec<SyntaxElement>,
    /// Docstring cut out of its line when the cursor reaches it.
    excise: Option<SyntaxNode>,
}

impl SideTracker {
    fn new(tree: &SyntaxNode) -> Self {
        Self {
            cursor: NodeCursor::from_tree(tree),
            locations: locate_all(tree),
            location: DocLocation::NoDocstring,
            deferred: Vec::new(),
            excise: None,
        }
    }

    fn next(&mut self) -> Result<Option<SyntaxElement>> {
        let element = self.cursor.next();
        if let (Some(SyntaxElement::Node(node)), Some(expr)) = (&element, &self.excise) {
            if node == expr {
                let expr = expr.clone();
                self.excise = None;
                return consume_inline_docstring(&mut self.cursor, &expr);
            }
        }
        Ok(element)
    }

    fn enter_scope(&mut self, scope: &SyntaxNode) -> Result<()> {
        self.location = self.locations.get(scope).cloned().ok_or_else(|| {
            DoconlyError::invariant(format!("no docstring lookup for {:?}", scope.kind()))
        })?;
        Ok(())
    }

    fn owns_container(&self, element: &Option<SyntaxElement>) -> bool {
        match (element, self.location.container()) {
            (Some(SyntaxElement::Node(node)), Some(container)) => node == container,
            _ => false,
        }
    }

    fn is_docstring_expr(&self, element: &SyntaxElement) -> bool {
        matches!(
            (element, self.location.expr()),
            (SyntaxElement::Node(node), Some(expr)) if node == expr
        )
    }

    fn consume_docstring(&mut self) -> Result<Option<SyntaxElement>> {
        let expr = self
            .location
            .expr()
            .cloned()
            .ok_or_else(|| DoconlyError::invariant("no docstring to consume"))?;
        consume_docstring(&mut self.cursor, &expr, &mut self.deferred)
    }

    fn consume_leading_lines(&mut self, statement: &SyntaxNode) -> Result<()> {
        consume_leading_lines(&mut self.cursor, statement, &mut self.deferred)
    }

    fn skip_docstring(&mut self, first: &SyntaxElement) -> Result<()> {
        match self.location.expr() {
            Some(expr) => skip_rest_of_expression(&mut self.cursor, expr, first),
            None => Err(DoconlyError::invariant("no docstring to skip")),
        }
    }

    fn flush_deferred(&mut self) {
        let deferred = std::mem::take(&mut self.deferred);
        self.cursor.push_back_all(deferred);
    }
}

/// The lockstep walk over a pair of trees.
struct DocstringComparator {
    before: SideTracker,
    after: SideTracker,
    /// How many sides of the current scope have a docstring still to handle.
    expr_count: u8,
    /// The next pair starts a pair of docstring expressions and is skipped.
    skip_compare: bool,
}

impl DocstringComparator {
    fn new(before: &SyntaxNode, after: &SyntaxNode) -> Self {
        Self {
            before: SideTracker::new(before),
            after: SideTracker::new(after),
            expr_count: 0,
            skip_compare: false,
        }
    }

    fn run(mut self) -> Result<bool> {
        loop {
            let mut b = self.before.next()?;
            let mut a = self.after.next()?;

            if self.expr_count == 1 {
                if let Some(owner) = self.docstring_owner(&b, &a) {
                    self.expr_count = 0;
                    let inline = match owner {
                        Side::Before => self.before.location.is_inline(),
                        Side::After => self.after.location.is_inline(),
                    };
                    if inline {
                        tracing::debug!(?owner, "cutting inline docstring");
                        let side = match owner {
                            Side::Before => &mut self.before,
                            Side::After => &mut self.after,
                        };
                        side.excise = side.location.expr().cloned();
                        self.flush_deferred();
                    } else {
                        tracing::debug!(?owner, "consuming docstring line");
                        match owner {
                            Side::Before => b = self.before.consume_docstring()?,
                            Side::After => a = self.after.consume_docstring()?,
                        }
                        if !self.realign(b, a)? {
                            return Ok(false);
                        }
                        continue;
                    }
                }
            }

            let (b, a) = match (b, a) {
                (None, None) => return Ok(true),
                (Some(b), Some(a)) => (b, a),
                (b, a) => {
                    tracing::debug!(
                        before_exhausted = b.is_none(),
                        after_exhausted = a.is_none(),
                        "trees differ in length"
                    );
                    return Ok(false);
                }
            };

            if self.skip_compare {
                self.skip_compare = false;
                self.before.skip_docstring(&b)?;
                self.after.skip_docstring(&a)?;
                continue;
            }
            if !shallow_eq(&b, &a) {
                log_mismatch(&b, &a);
                return Ok(false);
            }

            if self.expr_count == 2
                && self.before.is_docstring_expr(&b)
                && self.after.is_docstring_expr(&a)
            {
                self.expr_count = 0;
                self.skip_compare = true;
                continue;
            }

            if let (SyntaxElement::Node(b), SyntaxElement::Node(a)) = (&b, &a) {
                if b.kind().is_scope() {
                    self.enter_scope(b, a)?;
                }
            }
        }
    }

    /// The side whose docstring container is at hand, when only one side has a docstring.
    fn docstring_owner(
        &self,
        b: &Option<SyntaxElement>,
        a: &Option<SyntaxElement>,
    ) -> Option<Side> {
        if self.before.owns_container(b) {
            Some(Side::Before)
        } else if self.after.owns_container(a) {
            Some(Side::After)
        } else {
            None
        }
    }

    fn enter_scope(&mut self, b: &SyntaxNode, a: &SyntaxNode) -> Result<()> {
        self.before.enter_scope(b)?;
        self.after.enter_scope(a)?;
        self.expr_count = u8::from(self.before.location.has_docstring())
            + u8::from(self.after.location.has_docstring());
        tracing::trace!(kind = ?b.kind(), docstrings = self.expr_count, "entered scope");

        if self.expr_count == 1 && b.kind() == SyntaxKind::Module {
            self.before.consume_leading_lines(b)?;
            self.after.consume_leading_lines(a)?;
        }
        Ok(())
    }

    /// After a one-sided docstring was consumed, walk both sides to the next
    /// statement and drop its leading lines.
    ///
    /// Returns `false` when the trees differ on the way.
    fn realign(&mut self, b: Option<SyntaxElement>, a: Option<SyntaxElement>) -> Result<bool> {
        if let Some(b) = b {
            self.before.cursor.push_front(b);
        }
        if let Some(a) = a {
            self.after.cursor.push_front(a);
        }

        let (b, a) = loop {
            match (self.before.next()?, self.after.next()?) {
                (None, None) => {
                    // The docstring was the last statement of the module.
                    self.flush_deferred();
                    return Ok(true);
                }
                (Some(b), Some(a)) => {
                    if !shallow_eq(&b, &a) {
                        log_mismatch(&b, &a);
                        return Ok(false);
                    }
                    if let (SyntaxElement::Node(b), SyntaxElement::Node(a)) = (&b, &a) {
                        if b.kind().is_statement() {
                            break (b.clone(), a.clone());
                        }
                    }
                }
                _ => return Ok(false),
            }
        };

        self.before.consume_leading_lines(&b)?;
        self.after.consume_leading_lines(&a)?;
        if b.kind().is_scope() {
            self.enter_scope(&b, &a)?;
        }
        self.flush_deferred();
        Ok(true)
    }

    fn flush_deferred(&mut self) {
        self.before.flush_deferred();
        self.after.flush_deferred();
    }
}

fn log_mismatch(b: &SyntaxElement, a: &SyntaxElement) {
    tracing::debug!(
        before_kind = ?b.kind(),
        after_kind = ?a.kind(),
        before_offset = u32::from(b.text_range().start()),
        after_offset = u32::from(a.text_range().start()),
        "trees differ"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_only(before: &str, after: &str) -> bool {
        is_docstring_only(before, after).unwrap()
    }

    #[test]
    fn test_identical() {
        let source = concat!(
            "#!/usr/bin/env python\n\"\"\"Doc.\"\"\"\n\nimport os\n\n\n",
            "class A:\n    '''A.'''\n\n    def f(self):  # c\n        return 1\n",
        );
        assert!(doc_only(source, source));
    }

    #[test]
    fn test_changed_value() {
        assert!(!doc_only("x = 1", "x = 2"));
    }

    #[test]
    fn test_module_docstring_changed() {
        assert!(doc_only(
            "\"\"\"module docstring\"\"\"\nx = 1\n",
            "\"\"\"changed docstring\"\"\"\nx = 1\n"
        ));
    }

    #[test]
    fn test_module_docstring_and_code_changed() {
        assert!(!doc_only(
            "\"\"\"module docstring\"\"\"\nx = 1\n",
            "\"\"\"changed docstring\"\"\"\nx = 2\n"
        ));
    }

    #[test]
    fn test_function_docstring_removed() {
        assert!(doc_only(
            "def f():\n    \"\"\"d\"\"\"\n    return 1\n",
            "def f():\n    return 1\n"
        ));
    }

    #[test]
    fn test_comment_changed_while_docstring_added() {
        assert!(!doc_only(
            "class Foo:\n    # some code comment\n    ...\n",
            "class Foo:\n    # different code comment\n    \"\"\"class docstring\"\"\"\n    ...\n"
        ));
    }

    #[test]
    fn test_docstring_added_after_comment() {
        assert!(doc_only(
            "class Foo:\n    # some code comment\n    ...\n",
            "class Foo:\n    # some code comment\n    \"\"\"class docstring\"\"\"\n    ...\n"
        ));
    }

    #[test]
    fn test_parse_failure_is_error() {
        assert!(is_docstring_only("x = (", "x = 1").unwrap_err().is_parse_failure());
        assert!(is_docstring_only("x = 1", "def f(:\n").unwrap_err().is_parse_failure());
    }

    #[test]
    fn test_module_docstring_added_with_blank_lines() {
        assert!(doc_only(
            "import os\n",
            "\"\"\"Doc.\"\"\"\n\n\nimport os\n"
        ));
    }

    #[test]
    fn test_module_docstring_added_below_header() {
        assert!(doc_only(
            "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\nimport os\n",
            "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\n\"\"\"Doc.\"\"\"\nimport os\n"
        ));
    }

    #[test]
    fn test_module_header_changed_while_docstring_added() {
        assert!(!doc_only(
            "#!/usr/bin/env python\nimport os\n",
            "#!/usr/bin/env python3\n\"\"\"Doc.\"\"\"\nimport os\n"
        ));
    }

    #[test]
    fn test_invalid_python_is_parse_failure() {
        for source in [
            "x = = 1\n",
            "return return\n",
            "def 1():\n pass\n",
            "class A:\n pass\n pass)\n",
            "print 'hi'\n",
            "x = 0777\n",
            "x = 1 if y else\n",
            "import\n",
        ] {
            let err = is_docstring_only(source, source).unwrap_err();
            assert!(err.is_parse_failure(), "{source:?}: {err}");
        }
    }

    #[test]
    fn test_only_module_docstring_removed() {
        assert!(doc_only("\"\"\"Doc.\"\"\"\n", ""));
        assert!(doc_only("", "\"\"\"Doc.\"\"\"\n"));
        assert!(doc_only("\"\"\"Doc.\"\"\"\n\n# tail\n", "# tail\n"));
        assert!(!doc_only("\"\"\"Doc.\"\"\"\n\n# tail\n", "# other\n"));
    }

    #[test]
    fn test_class_docstring_changed_after_module_docstring_added() {
        assert!(doc_only(
            "class A:\n    \"\"\"a\"\"\"\n",
            "\"\"\"Doc.\"\"\"\nclass A:\n    \"\"\"b\"\"\"\n"
        ));
    }

    #[test]
    fn test_decorated_function_after_removed_docstring() {
        assert!(doc_only(
            "\"\"\"Doc.\"\"\"\n\n@dec\ndef f():\n    pass\n",
            "@dec\ndef f():\n    pass\n"
        ));
    }

    #[test]
    fn test_concatenated_docstring_changed() {
        assert!(doc_only(
            "def f():\n    (\"a\"\n     \"b\")\n    pass\n",
            "def f():\n    \"\"\"ab\"\"\"\n    pass\n"
        ));
    }

    #[test]
    fn test_inline_docstring_removed() {
        assert!(doc_only("def f(): \"\"\"d\"\"\"; return 1\n", "def f(): return 1\n"));
        assert!(doc_only("\"\"\"d\"\"\" ; x = 1\n", "x = 1\n"));
        assert!(!doc_only("def f(): \"\"\"d\"\"\"; return 1\n", "def f(): return 2\n"));
    }

    #[test]
    fn test_fstring_is_code() {
        assert!(!doc_only("def f():\n    f'a'\n", "def f():\n    f'b'\n"));
    }

    #[test]
    fn test_blank_line_change_next_to_kept_docstring() {
        assert!(!doc_only(
            "def f():\n    \"\"\"a\"\"\"\n    return 1\n",
            "def f():\n    \"\"\"b\"\"\"\n\n    return 1\n"
        ));
    }

    #[test]
    fn test_string_moved_out_of_docstring_position() {
        assert!(!doc_only(
            "def f():\n    \"\"\"a\"\"\"\n    x = 1\n",
            "def f():\n    x = 1\n    \"\"\"a\"\"\"\n"
        ));
    }

    #[test]
    fn test_comment_next_to_docstring_removed() {
        assert!(!doc_only(
            "def f():\n    \"\"\"a\"\"\"  # note\n    return 1\n",
            "def f():\n    return 1\n"
        ));
    }
}
