//! Syntax kinds and the rowan language binding.

/// Every token and node kind of the Python syntax tree.
///
/// Tokens carry their exact source text; nodes only group children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    // Trivia
    Whitespace = 0,
    Newline,
    Comment,

    // Tokens
    Name,
    Number,
    String,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Colon,
    Semicolon,
    Comma,
    Dot,
    At,
    Eq,
    Operator,

    // Nodes
    Module,
    EmptyLine,
    TrailingWhitespace,
    SimpleStatementLine,
    SimpleStatementSuite,
    IndentedBlock,
    ExprStmt,
    SmallStmt,
    ConcatenatedString,
    Decorator,
    ClassDef,
    FunctionDef,
    CompoundStmt,
    Clause,
}

use SyntaxKind::*;

const ALL_KINDS: [SyntaxKind; 33] = [
    Whitespace,
    Newline,
    Comment,
    Name,
    Number,
    String,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Colon,
    Semicolon,
    Comma,
    Dot,
    At,
    Eq,
    Operator,
    Module,
    EmptyLine,
    TrailingWhitespace,
    SimpleStatementLine,
    SimpleStatementSuite,
    IndentedBlock,
    ExprStmt,
    SmallStmt,
    ConcatenatedString,
    Decorator,
    ClassDef,
    FunctionDef,
    CompoundStmt,
    Clause,
];

impl SyntaxKind {
    /// Whitespace, newlines and comments.
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | Newline | Comment)
    }

    /// Purely-formatting elements that may be dropped next to a removed docstring.
    ///
    /// Comments are deliberately not part of this set.
    pub fn is_formatting(self) -> bool {
        matches!(self, Whitespace | Newline | EmptyLine | TrailingWhitespace)
    }

    /// Statement nodes: the units that own leading lines.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            SimpleStatementLine | CompoundStmt | ClassDef | FunctionDef
        )
    }

    /// Scopes that may carry a docstring.
    pub fn is_scope(self) -> bool {
        matches!(self, Module | ClassDef | FunctionDef)
    }

    /// Wrappers the docstring locator descends through.
    pub fn is_suite(self) -> bool {
        matches!(
            self,
            IndentedBlock | SimpleStatementSuite | SimpleStatementLine
        )
    }

    pub fn is_opening_bracket(self) -> bool {
        matches!(self, LParen | LBrack | LBrace)
    }

    pub fn is_closing_bracket(self) -> bool {
        matches!(self, RParen | RBrack | RBrace)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        rowan::SyntaxKind(kind as u16)
    }
}

/// Language implementation for Python
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PythonLanguage {}

impl rowan::Language for PythonLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        // Raw kinds only ever come from `kind_to_raw`, so the index is in range.
        ALL_KINDS[raw.0 as usize]
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<PythonLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<PythonLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<PythonLanguage>;

#[cfg(test)]
mod tests {
    use super::*;
    use rowan::Language;

    #[test]
    fn test_raw_round_trip() {
        for kind in ALL_KINDS {
            let raw = PythonLanguage::kind_to_raw(kind);
            assert_eq!(PythonLanguage::kind_from_raw(raw), kind);
        }
    }

    #[test]
    fn test_kind_classes() {
        assert!(Comment.is_trivia());
        assert!(!Comment.is_formatting());
        assert!(EmptyLine.is_formatting());
        assert!(FunctionDef.is_statement() && FunctionDef.is_scope());
        assert!(!IndentedBlock.is_statement());
        assert!(SimpleStatementLine.is_suite());
    }
}
