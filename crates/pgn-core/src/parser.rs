//! PGN parser: recursive descent over a flat token stream.
//!
//! Parsing is purely syntactic. Move text is kept as written and checked only
//! later, when a game tree is built from it (see `replay`).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PgnError;
use crate::token::{Token, TokenKind};
use crate::tokenizer::{tokenize, Tokenizer};

/// Variations nested deeper than this are rejected instead of recursing further.
pub const MAX_VARIATION_DEPTH: usize = 128;

/// Tag pairs in the order they appear.
pub type Headers = Vec<(String, String)>;

/// One element of movetext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MoveElement {
    MoveText(String),
    Comment(String),
    Nag(u8),
    Variation(Vec<MoveElement>),
    Termination(String),
}

pub type Moves = Vec<MoveElement>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedGame {
    pub headers: Headers,
    pub moves: Moves,
}

impl ParsedGame {
    /// Value of the first tag named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Move texts at the top level, ignoring variations and annotations.
    pub fn mainline_moves(&self) -> Vec<&str> {
        self.moves
            .iter()
            .filter_map(|element| match element {
                MoveElement::MoveText(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// What a game sequence does after a parse error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Recovery {
    /// Report the error and end the sequence.
    #[default]
    Abort,
    /// Log the error, discard tokens through the next result marker, continue.
    SkipToNextGame,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserConfig {
    pub recovery: Recovery,
}

/// Map `$n` or one of `! ? !! ?? !? ?!` to its NAG code.
pub fn nag_code(text: &str) -> Result<u8, PgnError> {
    let code = match text {
        "!" => Some(1),
        "?" => Some(2),
        "!!" => Some(3),
        "??" => Some(4),
        "!?" => Some(5),
        "?!" => Some(6),
        _ => text.strip_prefix('$').and_then(|digits| digits.parse().ok()),
    };
    code.ok_or_else(|| PgnError::InvalidNag(text.to_string()))
}

pub struct Parser<I> {
    tokens: I,
    peeked: Option<Token>,
    consumed: usize,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, PgnError>>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens,
            peeked: None,
            consumed: 0,
        }
    }

    fn pull(&mut self) -> Result<Token, PgnError> {
        Ok(self.tokens.next().transpose()?.unwrap_or_else(Token::eof))
    }

    fn peek(&mut self) -> Result<&Token, PgnError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.pull()?,
        };
        let token: &Token = self.peeked.insert(token);
        Ok(token)
    }

    fn advance(&mut self) -> Result<Token, PgnError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.pull()?,
        };
        if !token.is(TokenKind::Eof) {
            self.consumed += 1;
        }
        Ok(token)
    }

    fn expect_tag_part(&mut self, kind: TokenKind, expected: &'static str) -> Result<String, PgnError> {
        let token = self.advance()?;
        if token.is(kind) {
            Ok(token.value)
        } else {
            Err(PgnError::MalformedTag {
                expected,
                found: token.to_string(),
            })
        }
    }

    /// Consume `[Name "Value"]` pairs until the next token is not `[`.
    pub fn read_headers(&mut self) -> Result<Headers, PgnError> {
        let mut headers = Vec::new();
        while self.peek()?.is(TokenKind::LeftBracket) {
            self.advance()?;
            let name = self.expect_tag_part(TokenKind::Symbol, "tag name")?;
            let value = self.expect_tag_part(TokenKind::String, "quoted tag value")?;
            self.expect_tag_part(TokenKind::RightBracket, "']'")?;
            headers.push((name, value));
        }
        Ok(headers)
    }

    /// Consume movetext up to `)`, `[`, end of input or any token that cannot
    /// appear in movetext. The stopping token is left unread.
    pub fn read_movetext(&mut self, depth: usize) -> Result<Moves, PgnError> {
        if depth > MAX_VARIATION_DEPTH {
            return Err(PgnError::NestingTooDeep(MAX_VARIATION_DEPTH));
        }

        let mut moves = Vec::new();
        loop {
            let (kind, terminates, dots) = {
                let token = self.peek()?;
                let dots = !token.value.is_empty() && token.value.bytes().all(|b| b == b'.');
                (token.kind, token.terminates_game, dots)
            };

            match kind {
                TokenKind::Symbol if terminates => {
                    moves.push(MoveElement::Termination(self.advance()?.value));
                }
                TokenKind::Symbol if dots => {
                    self.advance()?;
                }
                TokenKind::Symbol => {
                    moves.push(MoveElement::MoveText(self.advance()?.value));
                }
                TokenKind::Number => {
                    self.advance()?;
                }
                TokenKind::Comment => {
                    moves.push(MoveElement::Comment(self.advance()?.value));
                }
                TokenKind::Nag => {
                    let token = self.advance()?;
                    moves.push(MoveElement::Nag(nag_code(&token.value)?));
                }
                TokenKind::LeftParen => {
                    self.advance()?;
                    let variation = self.read_movetext(depth + 1)?;
                    let close = self.advance()?;
                    if !close.is(TokenKind::RightParen) {
                        return Err(PgnError::UnexpectedToken {
                            expected: "')' closing a variation",
                            found: close.to_string(),
                        });
                    }
                    moves.push(MoveElement::Variation(variation));
                }
                TokenKind::RightParen
                | TokenKind::LeftBracket
                | TokenKind::RightBracket
                | TokenKind::String
                | TokenKind::Eof => break,
            }
        }
        Ok(moves)
    }

    /// Headers then movetext. `None` once the stream is exhausted.
    pub fn read_game(&mut self) -> Result<Option<ParsedGame>, PgnError> {
        if self.peek()?.is(TokenKind::Eof) {
            return Ok(None);
        }

        let start = self.consumed;
        let headers = self.read_headers()?;
        let moves = self.read_movetext(0)?;

        if self.consumed == start {
            let stray = self.advance()?;
            return Err(PgnError::UnexpectedToken {
                expected: "a tag pair or movetext",
                found: stray.to_string(),
            });
        }

        debug!(headers = headers.len(), elements = moves.len(), "Parsed game");
        Ok(Some(ParsedGame { headers, moves }))
    }

    /// Discard the rest of a broken game: through the next result marker, or
    /// up to a `[` that follows movetext, whichever comes first.
    pub fn skip_to_next_game(&mut self) -> Result<(), PgnError> {
        let mut seen_movetext = false;
        let mut after_bracket = false;
        loop {
            let (kind, terminates) = {
                let token = self.peek()?;
                (token.kind, token.terminates_game)
            };
            match kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::LeftBracket if seen_movetext => return Ok(()),
                _ => {}
            }

            self.advance()?;
            if terminates {
                return Ok(());
            }

            // A symbol straight after `[` is a tag name, not movetext.
            seen_movetext |= match kind {
                TokenKind::LeftBracket | TokenKind::RightBracket | TokenKind::String => false,
                TokenKind::Symbol => !after_bracket,
                _ => true,
            };
            after_bracket = kind == TokenKind::LeftBracket;
        }
    }
}

/// Lazily parsed games, pulled one at a time.
pub struct GameSequence<I> {
    parser: Parser<I>,
    config: ParserConfig,
    done: bool,
}

impl<I> Iterator for GameSequence<I>
where
    I: Iterator<Item = Result<Token, PgnError>>,
{
    type Item = Result<ParsedGame, PgnError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.parser.read_game() {
                Ok(Some(game)) => return Some(Ok(game)),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) if self.config.recovery == Recovery::SkipToNextGame && e.is_recoverable() => {
                    warn!(error = %e, "Skipping malformed game");
                    if let Err(e) = self.parser.skip_to_next_game() {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

pub fn game_sequence<I>(tokens: I) -> GameSequence<I>
where
    I: Iterator<Item = Result<Token, PgnError>>,
{
    game_sequence_with(tokens, ParserConfig::default())
}

pub fn game_sequence_with<I>(tokens: I, config: ParserConfig) -> GameSequence<I>
where
    I: Iterator<Item = Result<Token, PgnError>>,
{
    GameSequence {
        parser: Parser::new(tokens),
        config,
        done: false,
    }
}

/// Parse every game in in-memory PGN text.
pub fn parse_games(text: &str) -> GameSequence<Tokenizer<&[u8]>> {
    game_sequence(tokenize(text))
}

pub type FileGames = GameSequence<Tokenizer<BufReader<File>>>;

/// Stream the games of a PGN file, reading it incrementally.
pub fn games_in_file<P: AsRef<Path>>(path: P) -> Result<FileGames, PgnError> {
    games_in_file_with(path, ParserConfig::default())
}

pub fn games_in_file_with<P: AsRef<Path>>(path: P, config: ParserConfig) -> Result<FileGames, PgnError> {
    let file = File::open(path)?;
    Ok(game_sequence_with(Tokenizer::new(BufReader::new(file)), config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use MoveElement::*;

    fn text(s: &str) -> MoveElement {
        MoveText(s.to_string())
    }

    fn parse_one(pgn: &str) -> ParsedGame {
        let mut games = parse_games(pgn);
        let game = games.next().unwrap().unwrap();
        assert!(games.next().is_none());
        game
    }

    #[test]
    fn test_variation_scenario() {
        let game = parse_one("[Event \"Test\"]\n\n1. e4 (1. d4 d5) e5 *");
        assert_eq!(game.headers, vec![("Event".to_string(), "Test".to_string())]);
        assert_eq!(
            game.moves,
            vec![
                text("e4"),
                Variation(vec![text("d4"), text("d5")]),
                text("e5"),
                Termination("*".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_nags_and_nesting() {
        let game = parse_one("1. e4! {best by test} e5 $2 (1... c5 (1... e6) ?!) *");
        assert_eq!(
            game.moves,
            vec![
                text("e4"),
                Nag(1),
                Comment("best by test".to_string()),
                text("e5"),
                Nag(2),
                Variation(vec![text("c5"), Variation(vec![text("e6")]), Nag(6)]),
                Termination("*".to_string()),
            ]
        );
    }

    #[test]
    fn test_nag_codes() {
        let codes: Vec<u8> = ["!", "?", "!!", "??", "!?", "?!", "$0", "$255"]
            .iter()
            .map(|s| nag_code(s).unwrap())
            .collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 0, 255]);
        assert!(matches!(nag_code("$256"), Err(PgnError::InvalidNag(_))));
        assert!(matches!(nag_code("!!!"), Err(PgnError::InvalidNag(_))));
        assert!(matches!(nag_code("$"), Err(PgnError::InvalidNag(_))));
    }

    #[test]
    fn test_termination_does_not_stop_parsing() {
        let game = parse_one("1. e4 1-0 e5");
        assert_eq!(
            game.moves,
            vec![text("e4"), Termination("1-0".to_string()), text("e5")]
        );
    }

    #[test]
    fn test_multiple_games() {
        let pgn = "[White \"A\"]\n1. e4 1-0\n\n[White \"B\"]\n1. d4 0-1\n";
        let games: Vec<ParsedGame> = parse_games(pgn).map(|g| g.unwrap()).collect();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].header("White"), Some("A"));
        assert_eq!(games[1].header("White"), Some("B"));
        assert_eq!(games[1].mainline_moves(), vec!["d4"]);
    }

    #[test]
    fn test_malformed_tag_aborts_stream_by_default() {
        let pgn = "[White \"A\"]\n1. e4 1-0\n[White A]\n1. d4 0-1\n[White \"C\"]\n1. c4 *";
        let results: Vec<Result<ParsedGame, PgnError>> = parse_games(pgn).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PgnError::MalformedTag { .. })));
    }

    #[test]
    fn test_skip_mode_resumes_at_next_game() {
        let pgn = "[White \"A\"]\n1. e4 1-0\n[White A]\n1. d4 0-1\n[White \"C\"]\n1. c4 *";
        let config = ParserConfig {
            recovery: Recovery::SkipToNextGame,
        };
        let games: Vec<ParsedGame> = game_sequence_with(tokenize(pgn), config)
            .map(|g| g.unwrap())
            .collect();
        let whites: Vec<Option<&str>> = games.iter().map(|g| g.header("White")).collect();
        assert_eq!(whites, vec![Some("A"), Some("C")]);
    }

    #[test]
    fn test_skip_mode_keeps_game_after_unterminated_bad_game() {
        let pgn = "[White A]\n1. d4\n\n[White \"C\"]\n1. c4 *\n[White \"D\"]\n1. e4 *";
        let config = ParserConfig {
            recovery: Recovery::SkipToNextGame,
        };
        let games: Vec<ParsedGame> = game_sequence_with(tokenize(pgn), config)
            .map(|g| g.unwrap())
            .collect();
        let whites: Vec<Option<&str>> = games.iter().map(|g| g.header("White")).collect();
        assert_eq!(whites, vec![Some("C"), Some("D")]);
        assert_eq!(games[0].mainline_moves(), vec!["c4"]);
    }

    #[test]
    fn test_skip_mode_passes_over_remaining_tags_of_bad_game() {
        let pgn = "[White A]\n[Black \"B\"]\n1. d4 0-1\n[White \"C\"]\n1. c4 *";
        let config = ParserConfig {
            recovery: Recovery::SkipToNextGame,
        };
        let games: Vec<ParsedGame> = game_sequence_with(tokenize(pgn), config)
            .map(|g| g.unwrap())
            .collect();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].header("White"), Some("C"));
    }

    #[test]
    fn test_latin1_tag_does_not_end_stream() {
        let bytes: &[u8] = b"[White \"Ren\xE9\"]\n1. e4 1-0\n\n[White \"B\"]\n1. d4 *";
        let games: Vec<ParsedGame> = game_sequence(Tokenizer::new(bytes))
            .map(|g| g.unwrap())
            .collect();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].header("White"), Some("Ren\u{FFFD}"));
        assert_eq!(games[1].mainline_moves(), vec!["d4"]);
    }

    #[test]
    fn test_stray_closing_paren_is_an_error() {
        let mut games = parse_games("1. e4 ) e5");
        assert_eq!(games.next().unwrap().unwrap().moves, vec![text("e4")]);
        assert!(matches!(
            games.next(),
            Some(Err(PgnError::UnexpectedToken { .. }))
        ));
        assert!(games.next().is_none());
    }

    #[test]
    fn test_unclosed_variation_is_an_error() {
        let mut games = parse_games("1. e4 (1. d4 d5");
        assert!(matches!(
            games.next(),
            Some(Err(PgnError::UnexpectedToken { .. }))
        ));
    }

    #[test]
    fn test_runaway_nesting_is_rejected() {
        let pgn = format!("e4 {}", "(".repeat(MAX_VARIATION_DEPTH + 2));
        let mut games = parse_games(&pgn);
        assert!(matches!(games.next(), Some(Err(PgnError::NestingTooDeep(_)))));
    }

    #[test]
    fn test_empty_input_has_no_games() {
        assert!(parse_games("").next().is_none());
        assert!(parse_games("  \n ; nothing here\n").next().is_none());
    }

    #[test]
    fn test_parse_tree_serializes() {
        let game = parse_one("1. e4 $1 *");
        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["moves"][0]["kind"], "move_text");
        assert_eq!(json["moves"][1]["value"], 1);
    }
}
