//! Annotated chess games as persistent trees, and their PGN text form.
//!
//! Text goes through [`tokenizer`] and [`parser`] into a syntax-only
//! [`ParsedGame`]. [`replay::build_game`] turns that into a [`Game`] by playing
//! every move on a [`Board`], and [`export`] writes a `Game` back out as PGN.

pub mod board;
pub mod error;
pub mod export;
pub mod game;
pub mod parser;
pub mod replay;
pub mod tags;
pub mod token;
pub mod tokenizer;

pub use board::{Board, Color, Move, MoveNotation, STANDARD_START_FEN};
pub use error::{BoardError, GameError, PgnError};
pub use export::{export_with, to_pgn, ExportOptions};
pub use game::{AnnotationKey, Game, Node, NodeId};
pub use parser::{
    game_sequence, game_sequence_with, games_in_file, games_in_file_with, parse_games,
    GameSequence, MoveElement, ParsedGame, ParserConfig, Recovery,
};
pub use replay::build_game;
pub use tags::GameTags;
pub use token::{Token, TokenKind};
pub use tokenizer::{tokenize, Tokenizer};
