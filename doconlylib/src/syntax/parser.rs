//! Statement-level parser building the lossless tree.
//!
//! The token stream is first split into logical lines (a newline inside
//! brackets does not end a line). Lines holding only whitespace and comments
//! become `EmptyLine` nodes; they are attached as the module header, as the
//! leading lines of the statement that follows them, or as the footer of the
//! indented block they close.

use rowan::GreenNodeBuilder;

use crate::Result;

use super::kind::{SyntaxKind, SyntaxNode};
use super::lexer::{error_at, tokenize, Token};
use super::validate::validate;

const SMALL_STATEMENT_KEYWORDS: &[&str] = &[
    "pass", "break", "continue", "return", "raise", "global", "nonlocal", "del", "import", "from",
    "assert",
];

const COMPOUND_KEYWORDS: &[&str] = &["if", "while", "for", "try", "with"];

const CLAUSE_KEYWORDS: &[&str] = &["elif", "else", "except", "finally"];

/// Parse Python source text into a lossless syntax tree.
///
/// The text of the returned tree is always identical to `source`. Text
/// that is not valid Python 3 is a parse error.
pub fn parse_module(source: &str) -> Result<SyntaxNode> {
    let tokens = tokenize(source)?;
    let lines = split_lines(source, &tokens)?;
    let mut parser = Parser::new(source, tokens, lines);
    parser.module()?;
    validate(source)?;
    Ok(parser.finish())
}

/// A logical line, as a half-open range of token indices.
#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    end: usize,
    blank: bool,
}

fn split_lines(source: &str, tokens: &[Token<'_>]) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut open: Vec<&Token<'_>> = Vec::new();

    let push_line = |lines: &mut Vec<Line>, start: usize, end: usize| {
        let blank = tokens[start..end].iter().all(|t| t.kind.is_trivia());
        lines.push(Line { start, end, blank });
    };

    for (i, token) in tokens.iter().enumerate() {
        if token.kind.is_opening_bracket() {
            open.push(token);
        } else if token.kind.is_closing_bracket() {
            match open.pop() {
                Some(opener) if closes(opener.kind, token.kind) => {}
                Some(opener) => {
                    return Err(error_at(
                        source,
                        token.offset,
                        format!(
                            "closing parenthesis '{}' does not match opening parenthesis '{}'",
                            token.text, opener.text
                        ),
                    ))
                }
                None => {
                    return Err(error_at(
                        source,
                        token.offset,
                        format!("unmatched '{}'", token.text),
                    ))
                }
            }
        } else if token.kind == SyntaxKind::Newline && open.is_empty() {
            push_line(&mut lines, start, i + 1);
            start = i + 1;
        }
    }

    if let Some(opener) = open.last() {
        return Err(error_at(
            source,
            opener.offset,
            format!("'{}' was never closed", opener.text),
        ));
    }
    if start < tokens.len() {
        push_line(&mut lines, start, tokens.len());
    }

    Ok(lines)
}

fn closes(open: SyntaxKind, close: SyntaxKind) -> bool {
    matches!(
        (open, close),
        (SyntaxKind::LParen, SyntaxKind::RParen)
            | (SyntaxKind::LBrack, SyntaxKind::RBrack)
            | (SyntaxKind::LBrace, SyntaxKind::RBrace)
    )
}

fn is_augmented_assignment(text: &str) -> bool {
    text.ends_with('=') && !matches!(text, "==" | "!=" | "<=" | ">=" | ":=")
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    lines: Vec<Line>,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token<'a>>, lines: Vec<Line>) -> Self {
        Self {
            source,
            tokens,
            lines,
            pos: 0,
            builder: GreenNodeBuilder::new(),
        }
    }

    fn finish(self) -> SyntaxNode {
        SyntaxNode::new_root(self.builder.finish())
    }

    // ---- token and line helpers ----

    fn kind(&self, idx: usize) -> SyntaxKind {
        self.tokens[idx].kind
    }

    fn text(&self, idx: usize) -> &'a str {
        self.tokens[idx].text
    }

    fn is_name(&self, idx: usize, names: &[&str]) -> bool {
        self.kind(idx) == SyntaxKind::Name && names.contains(&self.text(idx))
    }

    fn first_significant(&self, from: usize, end: usize) -> Option<usize> {
        (from..end).find(|&i| !self.kind(i).is_trivia())
    }

    fn last_significant(&self, from: usize, end: usize) -> Option<usize> {
        (from..end).rev().find(|&i| !self.kind(i).is_trivia())
    }

    /// Indentation of a line, without a byte order mark.
    fn indent_of(&self, line: usize) -> &'a str {
        let first = self.lines[line].start;
        match self.tokens.get(first) {
            Some(token) if token.kind == SyntaxKind::Whitespace => {
                token.text.trim_start_matches('\u{feff}')
            }
            _ => "",
        }
    }

    fn has_comment(&self, line: usize) -> bool {
        let Line { start, end, .. } = self.lines[line];
        (start..end).any(|i| self.kind(i) == SyntaxKind::Comment)
    }

    /// Offset used to report errors about a line (or the end of input).
    fn line_offset(&self, line: usize) -> usize {
        self.lines
            .get(line)
            .and_then(|l| self.first_significant(l.start, l.end))
            .map(|i| self.tokens[i].offset)
            .unwrap_or(self.source.len())
    }

    fn collect_blank_lines(&mut self) -> Vec<usize> {
        let mut blank = Vec::new();
        while self.pos < self.lines.len() && self.lines[self.pos].blank {
            blank.push(self.pos);
            self.pos += 1;
        }
        blank
    }

    // ---- emission ----

    fn token(&mut self, idx: usize) {
        let token = self.tokens[idx];
        self.builder.token(token.kind.into(), token.text);
    }

    fn token_range(&mut self, from: usize, end: usize) {
        for i in from..end {
            self.token(i);
        }
    }

    fn empty_lines(&mut self, lines: &[usize]) {
        for &line in lines {
            let Line { start, end, .. } = self.lines[line];
            self.builder.start_node(SyntaxKind::EmptyLine.into());
            self.token_range(start, end);
            self.builder.finish_node();
        }
    }

    fn trailing_whitespace(&mut self, from: usize, end: usize) {
        self.builder.start_node(SyntaxKind::TrailingWhitespace.into());
        self.token_range(from, end);
        self.builder.finish_node();
    }

    /// Emit the indentation token of the current line, returning the next token index.
    fn indent(&mut self) -> usize {
        let start = self.lines[self.pos].start;
        if self.kind(start) == SyntaxKind::Whitespace {
            self.token(start);
            start + 1
        } else {
            start
        }
    }

    // ---- grammar ----

    fn module(&mut self) -> Result<()> {
        self.builder.start_node(SyntaxKind::Module.into());
        let header = self.collect_blank_lines();
        self.empty_lines(&header);
        let footer = self.block("", Vec::new())?;
        self.empty_lines(&footer);
        self.builder.finish_node();
        Ok(())
    }

    /// Parse statements at `indent` until a dedent or the end of input.
    ///
    /// Returns the blank lines read but not yet attached to any node.
    fn block(&mut self, indent: &str, mut pending: Vec<usize>) -> Result<Vec<usize>> {
        loop {
            pending.extend(self.collect_blank_lines());
            if self.pos >= self.lines.len() {
                return Ok(pending);
            }

            let line_indent = self.indent_of(self.pos);
            if line_indent == indent {
                let leading = std::mem::take(&mut pending);
                pending = self.statement(indent, &leading)?;
            } else if indent.starts_with(line_indent) {
                return Ok(pending);
            } else if line_indent.starts_with(indent) {
                return Err(error_at(
                    self.source,
                    self.line_offset(self.pos),
                    "unexpected indent",
                ));
            } else {
                return Err(error_at(
                    self.source,
                    self.line_offset(self.pos),
                    "unindent does not match any outer indentation level",
                ));
            }
        }
    }

    fn statement(&mut self, indent: &str, leading: &[usize]) -> Result<Vec<usize>> {
        let Line { start, end, .. } = self.lines[self.pos];
        let Some(first) = self.first_significant(start, end) else {
            return Err(error_at(self.source, self.line_offset(self.pos), "invalid syntax"));
        };

        if self.kind(first) == SyntaxKind::At {
            return self.decorated(indent, leading);
        }
        if let Some(kind) = self.definition_kind(first, end) {
            return self.compound(kind, indent, leading);
        }
        if self.is_name(first, COMPOUND_KEYWORDS)
            || (self.is_name(first, &["async"]) && self.next_is_name(first, end, &["for", "with"]))
            || (self.is_name(first, &["match", "case"]) && self.is_soft_compound(first, end))
        {
            return self.compound(SyntaxKind::CompoundStmt, indent, leading);
        }
        if self.is_name(first, CLAUSE_KEYWORDS) {
            return Err(error_at(
                self.source,
                self.tokens[first].offset,
                format!("'{}' without a matching statement", self.text(first)),
            ));
        }

        self.simple_line(leading)?;
        Ok(Vec::new())
    }

    fn next_is_name(&self, idx: usize, end: usize, names: &[&str]) -> bool {
        self.first_significant(idx + 1, end)
            .is_some_and(|next| self.is_name(next, names))
    }

    fn definition_kind(&self, first: usize, end: usize) -> Option<SyntaxKind> {
        if self.is_name(first, &["def"])
            || (self.is_name(first, &["async"]) && self.next_is_name(first, end, &["def"]))
        {
            Some(SyntaxKind::FunctionDef)
        } else if self.is_name(first, &["class"]) {
            Some(SyntaxKind::ClassDef)
        } else {
            None
        }
    }

    /// `match` and `case` are keywords only when they head a block.
    fn is_soft_compound(&self, first: usize, end: usize) -> bool {
        let Some(next) = self.first_significant(first + 1, end) else {
            return false;
        };
        let starts_expression = match self.kind(next) {
            SyntaxKind::Eq
            | SyntaxKind::Dot
            | SyntaxKind::Colon
            | SyntaxKind::Comma
            | SyntaxKind::Semicolon => false,
            SyntaxKind::Operator => !is_augmented_assignment(self.text(next)),
            kind => !kind.is_closing_bracket(),
        };
        starts_expression && self.header_colon(next, end).is_ok()
    }

    fn simple_line(&mut self, leading: &[usize]) -> Result<()> {
        let end = self.lines[self.pos].end;
        self.builder.start_node(SyntaxKind::SimpleStatementLine.into());
        self.empty_lines(leading);
        let from = self.indent();
        self.small_statements(from, end)?;
        self.builder.finish_node();
        self.pos += 1;
        Ok(())
    }

    /// Emit `;`-separated small statements followed by the line's trailing whitespace.
    fn small_statements(&mut self, from: usize, end: usize) -> Result<()> {
        let Some(last) = self.last_significant(from, end) else {
            return Err(error_at(self.source, self.line_offset(self.pos), "invalid syntax"));
        };
        let body_end = last + 1;

        let mut i = from;
        while i < body_end {
            if self.kind(i) == SyntaxKind::Whitespace {
                self.token(i);
                i += 1;
                continue;
            }
            if self.kind(i) == SyntaxKind::Semicolon {
                return Err(error_at(
                    self.source,
                    self.tokens[i].offset,
                    "invalid syntax",
                ));
            }

            let mut j = i;
            let mut depth = 0usize;
            while j < body_end {
                let kind = self.kind(j);
                if kind.is_opening_bracket() {
                    depth += 1;
                } else if kind.is_closing_bracket() {
                    depth = depth.saturating_sub(1);
                } else if kind == SyntaxKind::Semicolon && depth == 0 {
                    break;
                }
                j += 1;
            }

            let stmt_end = self.last_significant(i, j).map_or(j, |k| k + 1);
            self.small_statement(i, stmt_end);
            self.token_range(stmt_end, j);
            if j < body_end {
                self.token(j);
                i = j + 1;
            } else {
                i = j;
            }
        }

        self.trailing_whitespace(body_end, end);
        Ok(())
    }

    fn small_statement(&mut self, from: usize, end: usize) {
        let kind = if self.is_name(from, SMALL_STATEMENT_KEYWORDS) || self.has_assignment(from, end)
        {
            SyntaxKind::SmallStmt
        } else {
            SyntaxKind::ExprStmt
        };
        self.builder.start_node(kind.into());
        self.expression(from, end);
        self.builder.finish_node();
    }

    /// Assignment, augmented assignment or annotation at the top level.
    fn has_assignment(&self, from: usize, end: usize) -> bool {
        let mut depth = 0usize;
        let mut lambdas = 0usize;
        for i in from..end {
            let kind = self.kind(i);
            if kind.is_opening_bracket() {
                depth += 1;
            } else if kind.is_closing_bracket() {
                depth = depth.saturating_sub(1);
            } else if depth > 0 {
                continue;
            } else if kind == SyntaxKind::Eq {
                return true;
            } else if kind == SyntaxKind::Operator && is_augmented_assignment(self.text(i)) {
                return true;
            } else if self.is_name(i, &["lambda"]) {
                lambdas += 1;
            } else if kind == SyntaxKind::Colon {
                if lambdas == 0 {
                    return true;
                }
                lambdas -= 1;
            }
        }
        false
    }

    /// Emit expression tokens, grouping adjacent string literals.
    fn expression(&mut self, from: usize, end: usize) {
        let mut i = from;
        while i < end {
            if self.kind(i) == SyntaxKind::String {
                let mut last = i;
                let mut j = i + 1;
                while j < end {
                    match self.kind(j) {
                        kind if kind.is_trivia() => j += 1,
                        SyntaxKind::String => {
                            last = j;
                            j += 1;
                        }
                        _ => break,
                    }
                }
                if last > i {
                    self.builder.start_node(SyntaxKind::ConcatenatedString.into());
                    self.token_range(i, last + 1);
                    self.builder.finish_node();
                    i = last + 1;
                    continue;
                }
            }
            self.token(i);
            i += 1;
        }
    }

    /// The colon closing a compound statement header.
    fn header_colon(&self, from: usize, end: usize) -> Result<usize> {
        let mut depth = 0usize;
        let mut lambdas = 0usize;
        for i in from..end {
            let kind = self.kind(i);
            if kind.is_opening_bracket() {
                depth += 1;
            } else if kind.is_closing_bracket() {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && self.is_name(i, &["lambda"]) {
                lambdas += 1;
            } else if depth == 0 && kind == SyntaxKind::Colon {
                if lambdas == 0 {
                    return Ok(i);
                }
                lambdas -= 1;
            }
        }
        Err(error_at(
            self.source,
            self.line_offset(self.pos),
            "expected ':'",
        ))
    }

    fn compound(
        &mut self,
        kind: SyntaxKind,
        indent: &str,
        leading: &[usize],
    ) -> Result<Vec<usize>> {
        self.builder.start_node(kind.into());
        self.empty_lines(leading);
        let mut pending = self.header_and_suite(indent)?;
        if kind == SyntaxKind::CompoundStmt {
            pending = self.clauses(indent, pending)?;
        }
        self.builder.finish_node();
        Ok(pending)
    }

    /// `elif`, `else`, `except` and `finally` clauses following a compound statement.
    fn clauses(&mut self, indent: &str, mut pending: Vec<usize>) -> Result<Vec<usize>> {
        loop {
            pending.extend(self.collect_blank_lines());
            if self.pos >= self.lines.len() || self.indent_of(self.pos) != indent {
                return Ok(pending);
            }
            let Line { start, end, .. } = self.lines[self.pos];
            let is_clause = self
                .first_significant(start, end)
                .is_some_and(|first| self.is_name(first, CLAUSE_KEYWORDS));
            if !is_clause {
                return Ok(pending);
            }

            self.builder.start_node(SyntaxKind::Clause.into());
            self.empty_lines(&pending);
            pending = self.header_and_suite(indent)?;
            self.builder.finish_node();
        }
    }

    fn decorated(&mut self, indent: &str, leading: &[usize]) -> Result<Vec<usize>> {
        let checkpoint = self.builder.checkpoint();
        self.empty_lines(leading);

        let mut before_decorator = Vec::new();
        let kind = loop {
            let end = self.lines[self.pos].end;
            self.builder.start_node(SyntaxKind::Decorator.into());
            self.empty_lines(&before_decorator);
            let from = self.indent();
            let last = self.last_significant(from, end).unwrap_or(from);
            self.token_range(from, last + 1);
            self.trailing_whitespace(last + 1, end);
            self.builder.finish_node();
            self.pos += 1;

            let pending = self.collect_blank_lines();
            let next = if self.pos < self.lines.len() && self.indent_of(self.pos) == indent {
                let Line { start, end, .. } = self.lines[self.pos];
                self.first_significant(start, end).map(|first| (first, end))
            } else {
                None
            };

            match next {
                Some((first, _)) if self.kind(first) == SyntaxKind::At => {
                    before_decorator = pending;
                }
                Some((first, end)) => match self.definition_kind(first, end) {
                    Some(kind) => {
                        self.empty_lines(&pending);
                        break kind;
                    }
                    None => {
                        return Err(error_at(
                            self.source,
                            self.tokens[first].offset,
                            "expected function or class definition after decorator",
                        ))
                    }
                },
                None => {
                    return Err(error_at(
                        self.source,
                        self.line_offset(self.pos),
                        "expected function or class definition after decorator",
                    ))
                }
            }
        };

        self.builder.start_node_at(checkpoint, kind.into());
        let pending = self.header_and_suite(indent)?;
        self.builder.finish_node();
        Ok(pending)
    }

    fn header_and_suite(&mut self, indent: &str) -> Result<Vec<usize>> {
        let end = self.lines[self.pos].end;
        let from = self.indent();
        let colon = self.header_colon(from, end)?;
        self.token_range(from, colon + 1);
        self.suite(indent, colon + 1, end)
    }

    fn suite(&mut self, indent: &str, from: usize, end: usize) -> Result<Vec<usize>> {
        if self.first_significant(from, end).is_some() {
            self.builder.start_node(SyntaxKind::SimpleStatementSuite.into());
            self.small_statements(from, end)?;
            self.builder.finish_node();
            self.pos += 1;
            return Ok(Vec::new());
        }

        self.builder.start_node(SyntaxKind::IndentedBlock.into());
        self.trailing_whitespace(from, end);
        self.pos += 1;

        let pending = self.collect_blank_lines();
        let block_indent = if self.pos < self.lines.len() {
            self.indent_of(self.pos)
        } else {
            ""
        };
        if block_indent.len() <= indent.len() || !block_indent.starts_with(indent) {
            return Err(error_at(
                self.source,
                self.line_offset(self.pos),
                "expected an indented block",
            ));
        }

        let mut pending = self.block(block_indent, pending)?;
        let footer_len = pending
            .iter()
            .rposition(|&line| {
                self.has_comment(line) && self.indent_of(line).len() >= block_indent.len()
            })
            .map_or(0, |p| p + 1);
        let rest = pending.split_off(footer_len);
        self.empty_lines(&pending);
        self.builder.finish_node();
        Ok(rest)
    }
}
