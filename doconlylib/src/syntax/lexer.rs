//! Tokenizer for Python source text.
//!
//! Produces a flat token stream in which every byte of the input belongs to
//! exactly one token, so concatenating the token texts yields the input.

use crate::error::DoconlyError;
use crate::Result;

use super::kind::SyntaxKind;

/// A lexed token borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: usize,
}

/// Multi-character operators, longest first.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "!=", "==", "<=", ">=", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "@=", "**", "//", "<<", ">>", "+", "-", "*", "/", "%", "&",
    "|", "^", "~", "<", ">", "!",
];

const STRING_PREFIXES: &[&str] = &[
    "r", "u", "b", "f", "t", "br", "rb", "fr", "rf", "tr", "rt",
];

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>> {
    Lexer::new(source).run()
}

/// Build a parse error pointing at a byte offset of `source`.
pub(crate) fn error_at(source: &str, offset: usize, message: impl Into<String>) -> DoconlyError {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    DoconlyError::Parse {
        message: message.into(),
        line,
        column,
    }
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn push(&mut self, kind: SyntaxKind, len: usize) {
        let text = &self.source[self.pos..self.pos + len];
        self.tokens.push(Token {
            kind,
            text,
            offset: self.pos,
        });
        self.pos += len;
    }

    fn run(mut self) -> Result<Vec<Token<'a>>> {
        if let Some(after_bom) = self.rest().strip_prefix('\u{feff}') {
            let len = '\u{feff}'.len_utf8() + whitespace_len(after_bom);
            self.push(SyntaxKind::Whitespace, len);
        }

        while let Some(c) = self.peek() {
            let rest = self.rest();
            match c {
                ' ' | '\t' | '\x0c' | '\\' => {
                    let len = whitespace_len(rest);
                    if len == 0 {
                        return Err(error_at(
                            self.source,
                            self.pos,
                            "unexpected character after line continuation character",
                        ));
                    }
                    self.push(SyntaxKind::Whitespace, len);
                }
                '\r' if rest.starts_with("\r\n") => self.push(SyntaxKind::Newline, 2),
                '\n' | '\r' => self.push(SyntaxKind::Newline, 1),
                '#' => {
                    let len = rest.find(['\n', '\r']).unwrap_or(rest.len());
                    self.push(SyntaxKind::Comment, len);
                }
                '"' | '\'' => {
                    let len = self.string_len(0)?;
                    self.push(SyntaxKind::String, len);
                }
                c if is_name_start(c) => {
                    let name_len = rest
                        .char_indices()
                        .find(|&(_, c)| !is_name_continue(c))
                        .map(|(i, _)| i)
                        .unwrap_or(rest.len());
                    let name = &rest[..name_len];
                    let quoted = matches!(rest[name_len..].chars().next(), Some('"' | '\''));
                    if quoted && is_string_prefix(name) {
                        let len = self.string_len(name_len)?;
                        self.push(SyntaxKind::String, len);
                    } else {
                        self.push(SyntaxKind::Name, name_len);
                    }
                }
                c if c.is_ascii_digit() => {
                    let len = number_len(rest);
                    self.push(SyntaxKind::Number, len);
                }
                '.' if rest[1..].starts_with(|c: char| c.is_ascii_digit()) => {
                    let len = number_len(rest);
                    self.push(SyntaxKind::Number, len);
                }
                '(' => self.push(SyntaxKind::LParen, 1),
                ')' => self.push(SyntaxKind::RParen, 1),
                '[' => self.push(SyntaxKind::LBrack, 1),
                ']' => self.push(SyntaxKind::RBrack, 1),
                '{' => self.push(SyntaxKind::LBrace, 1),
                '}' => self.push(SyntaxKind::RBrace, 1),
                ';' => self.push(SyntaxKind::Semicolon, 1),
                ',' => self.push(SyntaxKind::Comma, 1),
                _ => match OPERATORS.iter().find(|op| rest.starts_with(*op)) {
                    Some(op) => self.push(SyntaxKind::Operator, op.len()),
                    None => {
                        let kind = match c {
                            ':' => SyntaxKind::Colon,
                            '.' => SyntaxKind::Dot,
                            '@' => SyntaxKind::At,
                            '=' => SyntaxKind::Eq,
                            _ => {
                                return Err(error_at(
                                    self.source,
                                    self.pos,
                                    format!("invalid character '{}'", c),
                                ))
                            }
                        };
                        self.push(kind, 1);
                    }
                },
            }
        }

        Ok(self.tokens)
    }

    /// Length of a string literal starting at the current position, whose
    /// quote begins `prefix_len` bytes in.
    fn string_len(&self, prefix_len: usize) -> Result<usize> {
        let rest = self.rest();
        let body = &rest[prefix_len..];
        let quote = match body.chars().next() {
            Some(q) => q,
            None => return Err(error_at(self.source, self.pos, "unterminated string literal")),
        };
        let triple: String = std::iter::repeat(quote).take(3).collect();
        let is_triple = body.starts_with(&triple);
        let open_len = if is_triple { 3 } else { 1 };

        let mut chars = body[open_len..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    // An escaped "\r\n" continues the literal like "\n" does.
                    if let Some((_, '\r')) = chars.next() {
                        if body[open_len + i + 2..].starts_with('\n') {
                            chars.next();
                        }
                    }
                }
                '\n' | '\r' if !is_triple => {
                    return Err(error_at(
                        self.source,
                        self.pos,
                        "unterminated string literal",
                    ));
                }
                c if c == quote => {
                    let end = open_len + i;
                    if !is_triple {
                        return Ok(prefix_len + end + 1);
                    }
                    if body[end..].starts_with(&triple) {
                        return Ok(prefix_len + end + 3);
                    }
                }
                _ => {}
            }
        }

        let message = if is_triple {
            "unterminated triple-quoted string literal"
        } else {
            "unterminated string literal"
        };
        Err(error_at(self.source, self.pos, message))
    }
}

/// Length of a run of blanks and backslash continuations.
fn whitespace_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut len = 0;
    while len < bytes.len() {
        match bytes[len] {
            b' ' | b'\t' | b'\x0c' => len += 1,
            b'\\' => match (bytes.get(len + 1), bytes.get(len + 2)) {
                (Some(b'\r'), Some(b'\n')) => len += 3,
                (Some(b'\n' | b'\r'), _) => len += 2,
                _ => break,
            },
            _ => break,
        }
    }
    len
}

fn number_len(text: &str) -> usize {
    let is_hex = text.starts_with("0x") || text.starts_with("0X");
    let mut prev = '\0';
    for (i, c) in text.char_indices() {
        let exponent_sign = (c == '+' || c == '-') && !is_hex && (prev == 'e' || prev == 'E');
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign) {
            return i;
        }
        prev = c;
    }
    text.len()
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic() || (!c.is_ascii() && !c.is_whitespace() && c != '\u{feff}')
}

fn is_name_continue(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c.is_numeric()
}

fn is_string_prefix(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    STRING_PREFIXES.contains(&lower.as_str())
}
