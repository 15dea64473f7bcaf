//! Line-buffered PGN tokenizer.
//!
//! Reads one line of bytes at a time from any `BufRead`, so large collections
//! are tokenized in bounded memory. Invalid UTF-8 is decoded lossily instead of
//! failing the stream. Brace comments may span lines.

use std::io::BufRead;

use tracing::trace;

use crate::error::PgnError;
use crate::token::{Token, TokenKind};

const BOM: char = '\u{feff}';

pub struct Tokenizer<R> {
    reader: R,
    line: Vec<char>,
    pos: usize,
    first_line: bool,
    finished: bool,
}

/// Tokenize in-memory PGN text.
pub fn tokenize(text: &str) -> Tokenizer<&[u8]> {
    Tokenizer::new(text.as_bytes())
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '=' | ':' | '/' | '-')
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            pos: 0,
            first_line: true,
            finished: false,
        }
    }

    /// Make sure the current line has an unread character. Returns false at end of input.
    fn fill(&mut self) -> Result<bool, PgnError> {
        while self.pos >= self.line.len() {
            let mut buf = Vec::new();
            if self.reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(false);
            }
            // Invalid UTF-8 (Latin-1 files) becomes U+FFFD.
            let decoded = String::from_utf8_lossy(&buf);
            let mut text: &str = &decoded;
            if self.first_line {
                text = text.strip_prefix(BOM).unwrap_or(text);
            }
            self.first_line = false;
            self.line = text.chars().collect();
            self.pos = 0;
        }
        Ok(true)
    }

    fn peek(&mut self) -> Result<Option<char>, PgnError> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(self.line.get(self.pos).copied())
    }

    fn bump(&mut self) -> Result<Option<char>, PgnError> {
        let c = self.peek()?;
        if c.is_some() {
            self.pos += 1;
        }
        Ok(c)
    }

    fn skip_line(&mut self) {
        self.pos = self.line.len();
    }

    /// Consume characters while `accept` holds, without crossing a line break.
    fn take_while<F>(&mut self, accept: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let start = self.pos;
        while self.pos < self.line.len() && accept(self.line[self.pos]) {
            self.pos += 1;
        }
        self.line[start..self.pos].iter().collect()
    }

    fn read_comment(&mut self) -> Result<Token, PgnError> {
        let mut body = String::new();
        loop {
            match self.bump()? {
                None | Some('}') => break,
                Some('\r') | Some('\n') => body.push(' '),
                Some(c) => body.push(c),
            }
        }
        Ok(Token::new(TokenKind::Comment, body.trim()))
    }

    fn read_string(&mut self) -> Result<Token, PgnError> {
        let mut value = String::new();
        while self.pos < self.line.len() {
            let c = self.line[self.pos];
            self.pos += 1;
            match c {
                '"' => break,
                '\r' | '\n' => break,
                '\\' => {
                    if let Some(&escaped) = self.line.get(self.pos) {
                        self.pos += 1;
                        value.push(escaped);
                    }
                }
                c => value.push(c),
            }
        }
        Ok(Token::new(TokenKind::String, value))
    }

    pub fn next_token(&mut self) -> Result<Token, PgnError> {
        loop {
            let Some(c) = self.peek()? else {
                return Ok(Token::eof());
            };

            match c {
                c if c.is_whitespace() => {
                    self.pos += 1;
                }
                ';' | '%' => self.skip_line(),
                '{' => {
                    self.pos += 1;
                    return self.read_comment();
                }
                '"' => {
                    self.pos += 1;
                    return self.read_string();
                }
                '(' | ')' | '[' | ']' => {
                    self.pos += 1;
                    let kind = match c {
                        '(' => TokenKind::LeftParen,
                        ')' => TokenKind::RightParen,
                        '[' => TokenKind::LeftBracket,
                        _ => TokenKind::RightBracket,
                    };
                    return Ok(Token::new(kind, c.to_string()));
                }
                '*' => {
                    self.pos += 1;
                    return Ok(Token::new(TokenKind::Symbol, "*"));
                }
                '$' => {
                    self.pos += 1;
                    let digits = self.take_while(|c| c.is_ascii_digit());
                    return Ok(Token::new(TokenKind::Nag, format!("${digits}")));
                }
                '!' | '?' => {
                    let glyph = self.take_while(|c| c == '!' || c == '?');
                    return Ok(Token::new(TokenKind::Nag, glyph));
                }
                '.' => {
                    let dots = self.take_while(|c| c == '.');
                    return Ok(Token::new(TokenKind::Symbol, dots));
                }
                c if is_symbol_char(c) => {
                    let text = self.take_while(is_symbol_char);
                    let kind = if text.chars().all(|c| c.is_ascii_digit()) {
                        TokenKind::Number
                    } else {
                        TokenKind::Symbol
                    };
                    return Ok(Token::new(kind, text));
                }
                other => {
                    trace!(character = %other, "Skipping unexpected character");
                    self.pos += 1;
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for Tokenizer<R> {
    type Item = Result<Token, PgnError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.next_token();
        match &item {
            Ok(token) if !token.is(TokenKind::Eof) => {}
            _ => self.finished = true,
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_values(text: &str) -> Vec<(TokenKind, String)> {
        tokenize(text)
            .map(|t| t.unwrap())
            .map(|t| (t.kind, t.value))
            .collect()
    }

    #[test]
    fn test_tag_pair_and_moves() {
        let tokens = kinds_and_values("[Event \"Test\"]\n\n1. e4 e5 1-0");
        let expected: Vec<(TokenKind, String)> = [
            (TokenKind::LeftBracket, "["),
            (TokenKind::Symbol, "Event"),
            (TokenKind::String, "Test"),
            (TokenKind::RightBracket, "]"),
            (TokenKind::Number, "1"),
            (TokenKind::Symbol, "."),
            (TokenKind::Symbol, "e4"),
            (TokenKind::Symbol, "e5"),
            (TokenKind::Symbol, "1-0"),
            (TokenKind::Eof, ""),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_termination_flags() {
        let flags: Vec<(String, bool)> = tokenize("e4 1/2-1/2 * 0-1 O-O")
            .map(|t| t.unwrap())
            .filter(|t| t.is(TokenKind::Symbol))
            .map(|t| (t.value, t.terminates_game))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("e4".to_string(), false),
                ("1/2-1/2".to_string(), true),
                ("*".to_string(), true),
                ("0-1".to_string(), true),
                ("O-O".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_multiline_comment_is_one_token() {
        let tokens = kinds_and_values("e4 { a fine\nopening\r\nmove } e5");
        assert_eq!(tokens[1], (TokenKind::Comment, "a fine opening  move".to_string()));
        assert_eq!(tokens[2], (TokenKind::Symbol, "e5".to_string()));
    }

    #[test]
    fn test_nags_and_suffixes() {
        let tokens = kinds_and_values("e4!? $14 Nf3??");
        assert_eq!(tokens[1], (TokenKind::Nag, "!?".to_string()));
        assert_eq!(tokens[2], (TokenKind::Nag, "$14".to_string()));
        assert_eq!(tokens[3], (TokenKind::Symbol, "Nf3".to_string()));
        assert_eq!(tokens[4], (TokenKind::Nag, "??".to_string()));
    }

    #[test]
    fn test_line_comments_are_dropped() {
        let tokens = kinds_and_values("% escape line\ne4 ; rest of line\ne5");
        let values: Vec<&str> = tokens.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, vec!["e4", "e5", ""]);
    }

    #[test]
    fn test_string_escapes_and_bom() {
        let tokens = kinds_and_values("\u{feff}[Event \"The \\\"Big\\\" One\"]");
        assert_eq!(tokens[0].0, TokenKind::LeftBracket);
        assert_eq!(tokens[2], (TokenKind::String, "The \"Big\" One".to_string()));
    }

    #[test]
    fn test_black_move_number_dots() {
        let tokens = kinds_and_values("12... Nf6");
        assert_eq!(tokens[0], (TokenKind::Number, "12".to_string()));
        assert_eq!(tokens[1], (TokenKind::Symbol, "...".to_string()));
        assert_eq!(tokens[2], (TokenKind::Symbol, "Nf6".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let bytes: &[u8] = b"[White \"Ren\xE9\"]\n1. e4 *";
        let tokens: Vec<Token> = Tokenizer::new(bytes).map(|t| t.unwrap()).collect();
        assert_eq!(tokens[2], Token::new(TokenKind::String, "Ren\u{FFFD}"));
        assert_eq!(tokens[6], Token::new(TokenKind::Symbol, "e4"));
        assert!(tokens[7].terminates_game);
    }

    #[test]
    fn test_iterator_ends_after_eof() {
        let mut tokens = tokenize("");
        assert_eq!(tokens.next().unwrap().unwrap(), Token::eof());
        assert!(tokens.next().is_none());
    }
}
