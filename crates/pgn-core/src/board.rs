//! Board adapter over shakmaty.
//!
//! A `Board` is an immutable value: applying a move produces a new board. It
//! remembers the FEN it started from and the moves played since, so it can be
//! handed to a UCI engine as `position fen ... moves ...`.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};

pub use shakmaty::{Color, Move};

use crate::error::BoardError;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Which notation a move string is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveNotation {
    San,
    Uci,
}

#[derive(Debug, Clone)]
pub struct Board {
    start_fen: String,
    pos: Chess,
    moves: Vec<Move>,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            start_fen: STANDARD_START_FEN.to_string(),
            pos: Chess::default(),
            moves: Vec::new(),
        }
    }
}

impl Board {
    /// Build a board from a FEN string.
    pub fn make_board(fen: &str) -> Result<Board, BoardError> {
        let invalid = |reason: String| BoardError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };

        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;

        let start_fen = Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string();
        Ok(Self {
            start_fen,
            pos,
            moves: Vec::new(),
        })
    }

    /// Apply a move, returning the resulting board.
    pub fn do_move(&self, m: &Move) -> Result<Board, BoardError> {
        if !self.pos.is_legal(m) {
            return Err(BoardError::IllegalMove(self.move_to_uci(m)));
        }

        let mut pos = self.pos.clone();
        pos.play_unchecked(m);

        let mut moves = self.moves.clone();
        moves.push(m.clone());

        Ok(Self {
            start_fen: self.start_fen.clone(),
            pos,
            moves,
        })
    }

    /// Resolve SAN text (check/mate suffixes allowed) against this position.
    pub fn move_from_san(&self, text: &str) -> Result<Move, BoardError> {
        let san: SanPlus = text
            .parse()
            .map_err(|_| BoardError::SanParse(text.to_string()))?;

        san.san
            .to_move(&self.pos)
            .map_err(|_| BoardError::IllegalMove(text.to_string()))
    }

    /// Resolve UCI text like `e2e4` or `e7e8q` against this position.
    pub fn move_from_uci(&self, text: &str) -> Result<Move, BoardError> {
        let uci: UciMove = text
            .parse()
            .map_err(|_| BoardError::UciParse(text.to_string()))?;

        uci.to_move(&self.pos)
            .map_err(|_| BoardError::IllegalMove(text.to_string()))
    }

    pub fn parse_move(&self, text: &str, notation: MoveNotation) -> Result<Move, BoardError> {
        match notation {
            MoveNotation::San => self.move_from_san(text),
            MoveNotation::Uci => self.move_from_uci(text),
        }
    }

    /// SAN for a move played from this position, e.g. `Nf3`, `Qxf7#`.
    ///
    /// With `include_move_number` the text is prefixed by `12. ` when White
    /// is to move or `12... ` when Black is.
    pub fn move_to_san(&self, m: &Move, include_move_number: bool) -> String {
        let mut after = self.pos.clone();
        let san = SanPlus::from_move_and_play_unchecked(&mut after, m);

        if !include_move_number {
            return san.to_string();
        }

        let number = self.pos.fullmoves().get();
        match self.pos.turn() {
            Color::White => format!("{number}. {san}"),
            Color::Black => format!("{number}... {san}"),
        }
    }

    pub fn move_to_uci(&self, m: &Move) -> String {
        m.to_uci(CastlingMode::Standard).to_string()
    }

    pub fn side_to_move(&self) -> Color {
        self.pos.turn()
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.moves.last()
    }

    pub fn fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    /// Engine-facing description: `position fen <start> moves <m1> <m2> ...`.
    pub fn board_to_uci(&self) -> String {
        let mut out = format!("position fen {}", self.start_fen);
        if !self.moves.is_empty() {
            out.push_str(" moves");
            for m in &self.moves {
                out.push(' ');
                out.push_str(&self.move_to_uci(m));
            }
        }
        out
    }
}
