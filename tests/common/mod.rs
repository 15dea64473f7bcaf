use pgn_core::{Game, MoveNotation, ParsedGame};

/// Play SAN moves from the cursor, one after another.
pub fn play(game: &Game, moves: &[&str]) -> Game {
    moves.iter().fold(game.clone(), |g, m| {
        g.add_move(m, MoveNotation::San)
            .unwrap_or_else(|e| panic!("move {m} rejected: {e}"))
    })
}

/// Parse exactly one game from PGN text.
#[allow(dead_code)]
pub fn parse_one(pgn: &str) -> ParsedGame {
    let mut games = pgn_core::parse_games(pgn);
    let game = games.next().expect("no game").expect("parse failed");
    assert!(games.next().is_none(), "more than one game");
    game
}

/// SAN of every mainline move, read back from the tree.
#[allow(dead_code)]
pub fn mainline_san(game: &Game) -> Vec<String> {
    let mut out = Vec::new();
    let mut node = game.root();
    while let Some(next) = node.mainline() {
        let m = next.last_move().expect("non-root node without a move");
        out.push(node.position().move_to_san(m, false));
        node = next.as_ref();
    }
    out
}

pub const SCHOLARS_MATE: [&str; 7] = ["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7#"];
