//! Lexical tokens of PGN text.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Symbol,
    String,
    Comment,
    Nag,
    Number,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Eof,
}

/// A lexical unit of PGN text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    /// Set on the result symbols `1-0`, `0-1`, `1/2-1/2` and `*`.
    pub terminates_game: bool,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        let value = value.into();
        let terminates_game = kind == TokenKind::Symbol && is_termination(&value);
        Self {
            kind,
            value,
            terminates_game,
        }
    }

    pub fn eof() -> Self {
        Self::new(TokenKind::Eof, "")
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

pub fn is_termination(text: &str) -> bool {
    matches!(text, "1-0" | "0-1" | "1/2-1/2" | "*")
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::LeftParen => f.write_str("'('"),
            TokenKind::RightParen => f.write_str("')'"),
            TokenKind::LeftBracket => f.write_str("'['"),
            TokenKind::RightBracket => f.write_str("']'"),
            kind => write!(f, "{kind:?} {:?}", self.value),
        }
    }
}
