//! Builds a game tree from a parsed game by replaying its moves.

use tracing::{debug, warn};

use crate::board::{Board, MoveNotation};
use crate::error::GameError;
use crate::game::{AnnotationKey, Game, NodeId};
use crate::parser::{MoveElement, ParsedGame};
use crate::tags::GameTags;

/// Replay `parsed` onto a fresh tree. The returned game's cursor is at the root.
///
/// Move text is resolved as SAN; the first illegal or unparseable move aborts
/// the whole game.
pub fn build_game(parsed: &ParsedGame) -> Result<Game, GameError> {
    let mut tags = GameTags::default();
    for (name, value) in &parsed.headers {
        tags.set(name, value);
    }

    let start = match parsed.header("FEN") {
        Some(fen) => Board::make_board(fen)?,
        None => Board::default(),
    };

    let game = Game::new(start, tags);
    let root = game.root().id();
    let game = replay_line(game, root, &parsed.moves, true)?;

    debug!(
        white = %game.tags().white,
        black = %game.tags().black,
        nodes = game.node_ids().len(),
        "Built game tree"
    );
    Ok(game.to_beginning())
}

fn replay_line(
    mut game: Game,
    start: NodeId,
    elements: &[MoveElement],
    at_root: bool,
) -> Result<Game, GameError> {
    let mut current = start;
    // Parent of the last move played; variations branch from here.
    let mut branch_point: Option<NodeId> = None;
    let mut last_move: Option<NodeId> = None;
    let mut pending_pre_comment: Option<String> = None;

    for element in elements {
        match element {
            MoveElement::MoveText(text) => {
                game = game.add_move_at(current, text, MoveNotation::San)?;
                if let Some(pre) = pending_pre_comment.take() {
                    game = game.annotate(AnnotationKey::PreComment, &pre);
                }
                branch_point = Some(current);
                current = game.cursor().id();
                last_move = Some(current);
            }
            MoveElement::Comment(text) => match last_move {
                Some(node) => game = append_annotation(&game, node, AnnotationKey::Comment, text)?,
                None if at_root => {
                    game = append_annotation(&game, start, AnnotationKey::PreComment, text)?
                }
                None => {
                    pending_pre_comment = Some(match pending_pre_comment.take() {
                        Some(prev) => format!("{prev} {text}"),
                        None => text.clone(),
                    });
                }
            },
            MoveElement::Nag(code) => match last_move {
                Some(node) => game = game.add_nag_at(node, *code)?,
                None => warn!(nag = code, "NAG before any move, ignored"),
            },
            MoveElement::Variation(inner) => match branch_point {
                Some(parent) => game = replay_line(game, parent, inner, false)?,
                None => warn!("Variation before any move, skipped"),
            },
            MoveElement::Termination(_) => {}
        }
    }

    // A variation holding only comments has no move to carry them.
    if let Some(text) = pending_pre_comment {
        if start == game.root().id() {
            warn!(comment = %text, "Comment-only variation at the root, dropped");
        } else {
            debug!(node = %start, "Comment-only variation, attached to the branch point");
            game = append_annotation(&game, start, AnnotationKey::Comment, &text)?;
        }
    }

    Ok(game)
}

/// Add `text` to an existing comment or pre-comment, separated by a space.
fn append_annotation(
    game: &Game,
    at: NodeId,
    key: AnnotationKey,
    text: &str,
) -> Result<Game, GameError> {
    let existing = game.find(|node| node.id() == at).and_then(|node| match &key {
        AnnotationKey::Comment => node.comment(),
        AnnotationKey::PreComment => node.pre_comment(),
        AnnotationKey::Other(name) => node.annotation(name),
    });

    let value = match existing {
        Some(prev) => format!("{prev} {text}"),
        None => text.to_string(),
    };
    game.annotate_at(at, key, &value)
}
