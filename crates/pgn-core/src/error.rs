//! Error types for the board adapter, the game tree and the PGN reader.

use thiserror::Error;

use crate::game::NodeId;

/// Failures reported by the board adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Illegal move '{0}'")]
    IllegalMove(String),

    #[error("Unparseable SAN '{0}'")]
    SanParse(String),

    #[error("Unparseable UCI '{0}'")]
    UciParse(String),
}

/// Failures reported by game tree mutations. The input game is never modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Illegal move '{0}'")]
    IllegalMove(String),

    #[error("Unparseable move '{0}'")]
    UnparseableMove(String),

    #[error("Invalid FEN '{0}'")]
    InvalidFen(String),
}

impl From<BoardError> for GameError {
    fn from(e: BoardError) -> Self {
        match e {
            BoardError::InvalidFen { fen, .. } => GameError::InvalidFen(fen),
            BoardError::IllegalMove(text) => GameError::IllegalMove(text),
            BoardError::SanParse(text) | BoardError::UciParse(text) => {
                GameError::UnparseableMove(text)
            }
        }
    }
}

/// Failures while tokenizing or parsing PGN text.
#[derive(Error, Debug)]
pub enum PgnError {
    #[error("Malformed tag pair: expected {expected}, found {found}")]
    MalformedTag { expected: &'static str, found: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: &'static str, found: String },

    #[error("Invalid NAG '{0}'")]
    InvalidNag(String),

    #[error("Variations nested deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PgnError {
    /// I/O failures end a stream regardless of the recovery mode.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PgnError::Io(_))
    }
}
