//! PGN export: game tree to text.

use crate::board::{Board, Color};
use crate::game::{Game, Node};

pub const WRAP_COLUMN: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_comments: bool,
    /// When false, only the chain of first children is written.
    pub include_variations: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_comments: true,
            include_variations: true,
        }
    }
}

pub fn to_pgn(game: &Game, include_comments: bool, include_variations: bool) -> String {
    export_with(
        game,
        &ExportOptions {
            include_comments,
            include_variations,
        },
    )
}

/// Seven-tag header block, blank line, wrapped movetext, result.
pub fn export_with(game: &Game, options: &ExportOptions) -> String {
    let mut out = String::new();
    for (name, value) in game.tags().roster() {
        out.push_str(&format!("[{name} \"{}\"]\n", escape_tag_value(value)));
    }
    out.push('\n');

    // The result is the last word of the movetext and wraps with it.
    let mut body = movetext(game.root(), options);
    if !body.is_empty() {
        body.push(' ');
    }
    body.push_str(&game.tags().result);
    out.push_str(&wrap(&body, WRAP_COLUMN));
    out.push('\n');
    out
}

impl Game {
    pub fn to_pgn(&self, options: &ExportOptions) -> String {
        export_with(self, options)
    }
}

fn escape_tag_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Collects movetext words. `(` sticks to the next word, `)` to the previous one.
#[derive(Default)]
struct MovetextWriter {
    words: Vec<String>,
    open_parens: usize,
}

impl MovetextWriter {
    fn word(&mut self, word: String) {
        let mut text = "(".repeat(self.open_parens);
        self.open_parens = 0;
        text.push_str(&word);
        self.words.push(text);
    }

    fn comment(&mut self, text: &str) {
        self.word(format!("{{{}}}", text.replace('}', "")));
    }

    fn open_variation(&mut self) {
        self.open_parens += 1;
    }

    fn close_variation(&mut self) {
        if let Some(last) = self.words.last_mut() {
            last.push(')');
        }
    }

    fn finish(self) -> String {
        self.words.join(" ")
    }
}

fn movetext(root: &Node, options: &ExportOptions) -> String {
    let mut writer = MovetextWriter::default();
    if options.include_comments {
        if let Some(pre) = root.pre_comment() {
            writer.comment(pre);
        }
    }
    write_continuation(root, &mut writer, options);
    writer.finish()
}

fn write_move(writer: &mut MovetextWriter, board: &Board, child: &Node, with_number: bool) {
    if let Some(m) = child.last_move() {
        writer.word(board.move_to_san(m, with_number));
    }
}

fn write_annotations(writer: &mut MovetextWriter, child: &Node, options: &ExportOptions) {
    if !options.include_comments {
        return;
    }
    for nag in child.nags() {
        writer.word(format!("${nag}"));
    }
    if let Some(comment) = child.comment() {
        writer.comment(comment);
    }
}

/// Mainline move from `node`, its sibling variations, then the rest of the mainline.
fn write_continuation(node: &Node, writer: &mut MovetextWriter, options: &ExportOptions) {
    let Some(main) = node.mainline() else {
        return;
    };
    let board = node.position();

    write_move(writer, board, main, board.side_to_move() == Color::White);
    write_annotations(writer, main, options);

    if options.include_variations {
        for variation in node.variations() {
            writer.open_variation();
            if options.include_comments {
                if let Some(pre) = variation.pre_comment() {
                    writer.comment(pre);
                }
            }
            write_move(writer, board, variation, true);
            write_annotations(writer, variation, options);
            write_continuation(variation, writer, options);
            writer.close_variation();
        }
    }

    write_continuation(main, writer, options);
}

/// Greedy word wrap; words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> String {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}
