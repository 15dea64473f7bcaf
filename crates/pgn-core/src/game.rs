//! Persistent game tree with a navigation cursor.
//!
//! Nodes are shared between snapshots through `Arc`. Every mutation copies
//! only the nodes on the path from the root to the edited node, so a `Game`
//! handed out earlier never observes later edits.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::board::{Board, Move, MoveNotation};
use crate::error::GameError;
use crate::tags::GameTags;

/// Process-wide node id source. Ids are unique, never reused, never reset.
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which annotation slot `annotate` writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKey {
    /// Text following the move that created the node.
    Comment,
    /// Text preceding the move. Meaningful on the root and on a variation's first move.
    PreComment,
    /// Free-form named annotation, kept on the node but not exported.
    Other(String),
}

/// A position in the tree. The first child is the mainline continuation, the
/// rest are variations in the order they were recorded.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    position: Board,
    children: Vec<Arc<Node>>,
    comment: Option<String>,
    pre_comment: Option<String>,
    nags: Vec<u8>,
    extras: BTreeMap<String, String>,
}

impl Node {
    fn new(position: Board) -> Self {
        Self {
            id: NodeId::next(),
            position,
            children: Vec::new(),
            comment: None,
            pre_comment: None,
            nags: Vec::new(),
            extras: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    /// The move that led to this node; `None` for the root.
    pub fn last_move(&self) -> Option<&Move> {
        self.position.last_move()
    }

    pub fn children(&self) -> &[Arc<Node>] {
        &self.children
    }

    pub fn mainline(&self) -> Option<&Arc<Node>> {
        self.children.first()
    }

    pub fn variations(&self) -> &[Arc<Node>] {
        self.children.get(1..).unwrap_or(&[])
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn pre_comment(&self) -> Option<&str> {
        self.pre_comment.as_deref()
    }

    pub fn nags(&self) -> &[u8] {
        &self.nags
    }

    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.extras.get(name).map(String::as_str)
    }

    /// Depth-first search, node before children, children in recorded order.
    pub fn find<F>(&self, predicate: F) -> Option<&Node>
    where
        F: Fn(&Node) -> bool,
    {
        find_node(self, &predicate)
    }
}

fn find_node<'a, F>(node: &'a Node, predicate: &F) -> Option<&'a Node>
where
    F: Fn(&Node) -> bool,
{
    if predicate(node) {
        return Some(node);
    }
    node.children
        .iter()
        .find_map(|child| find_node(child, predicate))
}

/// Same traversal order as `find_node`, recording child indices on the way down.
fn find_path<F>(node: &Node, predicate: &F, path: &mut Vec<usize>) -> bool
where
    F: Fn(&Node) -> bool,
{
    if predicate(node) {
        return true;
    }
    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        if find_path(child, predicate, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn node_at<'a>(root: &'a Arc<Node>, path: &[usize]) -> &'a Arc<Node> {
    path.iter().fold(root, |node, &i| &node.children[i])
}

/// Copy the nodes along `path`, apply `edit` to the last one and share everything else.
fn rebuild<E>(node: &Arc<Node>, path: &[usize], edit: E) -> Arc<Node>
where
    E: FnOnce(&mut Node),
{
    let mut copy = Node::clone(node);
    match path.split_first() {
        None => edit(&mut copy),
        Some((&i, rest)) => copy.children[i] = rebuild(&node.children[i], rest, edit),
    }
    Arc::new(copy)
}

/// An immutable game snapshot: tags, tree and cursor.
///
/// Every operation returns a new `Game`; the receiver is left as it was.
#[derive(Debug, Clone)]
pub struct Game {
    tags: GameTags,
    root: Arc<Node>,
    /// Child indices from the root to the cursor node.
    cursor: Vec<usize>,
}

/// Snapshot identity: same tags, same tree allocation, same cursor.
impl PartialEq for Game {
    fn eq(&self, other: &Self) -> bool {
        self.tags == other.tags && Arc::ptr_eq(&self.root, &other.root) && self.cursor == other.cursor
    }
}

impl Eq for Game {}

impl Default for Game {
    fn default() -> Self {
        Game::new(Board::default(), GameTags::default())
    }
}

impl Game {
    /// A new game whose root holds `start_position`; the cursor is at the root.
    pub fn new(start_position: Board, tags: GameTags) -> Game {
        Self {
            tags,
            root: Arc::new(Node::new(start_position)),
            cursor: Vec::new(),
        }
    }

    pub fn tags(&self) -> &GameTags {
        &self.tags
    }

    pub fn with_tags(&self, tags: GameTags) -> Game {
        Self {
            tags,
            ..self.clone()
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn cursor(&self) -> &Node {
        node_at(&self.root, &self.cursor)
    }

    pub fn cursor_path(&self) -> &[usize] {
        &self.cursor
    }

    pub fn current_position(&self) -> &Board {
        self.cursor().position()
    }

    /// Ids of every node, depth-first from the root.
    pub fn node_ids(&self) -> Vec<NodeId> {
        fn collect(node: &Node, out: &mut Vec<NodeId>) {
            out.push(node.id);
            for child in &node.children {
                collect(child, out);
            }
        }
        let mut ids = Vec::new();
        collect(&self.root, &mut ids);
        ids
    }

    fn path_of(&self, id: NodeId) -> Result<Vec<usize>, GameError> {
        let mut path = Vec::new();
        if find_path(&self.root, &|node: &Node| node.id == id, &mut path) {
            Ok(path)
        } else {
            Err(GameError::NodeNotFound(id))
        }
    }

    /// Play `text` from the cursor, recording it as the cursor's last child.
    pub fn add_move(&self, text: &str, notation: MoveNotation) -> Result<Game, GameError> {
        self.add_move_on_path(self.cursor.clone(), text, notation)
    }

    /// Play `text` from node `at`. Existing children are kept ahead of the new
    /// one, so this never replaces the mainline.
    pub fn add_move_at(
        &self,
        at: NodeId,
        text: &str,
        notation: MoveNotation,
    ) -> Result<Game, GameError> {
        let path = self.path_of(at)?;
        self.add_move_on_path(path, text, notation)
    }

    fn add_move_on_path(
        &self,
        mut path: Vec<usize>,
        text: &str,
        notation: MoveNotation,
    ) -> Result<Game, GameError> {
        let target = node_at(&self.root, &path);
        let m = target.position.parse_move(text, notation)?;
        let child = Node::new(target.position.do_move(&m)?);
        let index = target.children.len();

        trace!(parent = %target.id, child = %child.id, text, "Adding move");

        let child = Arc::new(child);
        let root = rebuild(&self.root, &path, |node| node.children.push(child));
        path.push(index);

        Ok(Self {
            tags: self.tags.clone(),
            root,
            cursor: path,
        })
    }

    /// Set an annotation on the cursor node.
    pub fn annotate(&self, key: AnnotationKey, value: &str) -> Game {
        self.annotate_on_path(&self.cursor, key, value)
    }

    /// Set an annotation on node `at`. A `Comment` on the root is ignored since
    /// no move leads to it.
    pub fn annotate_at(
        &self,
        at: NodeId,
        key: AnnotationKey,
        value: &str,
    ) -> Result<Game, GameError> {
        let path = self.path_of(at)?;
        Ok(self.annotate_on_path(&path, key, value))
    }

    fn annotate_on_path(&self, path: &[usize], key: AnnotationKey, value: &str) -> Game {
        if path.is_empty() && key == AnnotationKey::Comment {
            return self.clone();
        }

        let value = value.to_string();
        let root = rebuild(&self.root, path, |node| match key {
            AnnotationKey::Comment => node.comment = Some(value),
            AnnotationKey::PreComment => node.pre_comment = Some(value),
            AnnotationKey::Other(name) => {
                node.extras.insert(name, value);
            }
        });

        Self {
            root,
            ..self.clone()
        }
    }

    /// Append a NAG code to the cursor node.
    pub fn add_nag(&self, nag: u8) -> Game {
        let root = rebuild(&self.root, &self.cursor, |node| node.nags.push(nag));
        Self {
            root,
            ..self.clone()
        }
    }

    pub fn add_nag_at(&self, at: NodeId, nag: u8) -> Result<Game, GameError> {
        let path = self.path_of(at)?;
        let root = rebuild(&self.root, &path, |node| node.nags.push(nag));
        Ok(Self {
            root,
            ..self.clone()
        })
    }

    /// First node matching `predicate`, searching depth-first from the root.
    pub fn find<F>(&self, predicate: F) -> Option<&Node>
    where
        F: Fn(&Node) -> bool,
    {
        self.root.find(predicate)
    }

    /// Move the cursor to the first node matching `predicate`.
    pub fn goto<F>(&self, predicate: F) -> Option<Game>
    where
        F: Fn(&Node) -> bool,
    {
        let mut path = Vec::new();
        if !find_path(&self.root, &predicate, &mut path) {
            return None;
        }
        Some(self.with_cursor(path))
    }

    pub fn goto_node_id(&self, id: NodeId) -> Option<Game> {
        self.goto(|node| node.id == id)
    }

    fn with_cursor(&self, cursor: Vec<usize>) -> Game {
        Self {
            tags: self.tags.clone(),
            root: Arc::clone(&self.root),
            cursor,
        }
    }

    pub fn at_beginning(&self) -> bool {
        self.cursor.is_empty()
    }

    pub fn at_end(&self) -> bool {
        self.cursor().is_leaf()
    }

    /// Cursor to its parent; unchanged at the root.
    pub fn step_back(&self) -> Game {
        let mut cursor = self.cursor.clone();
        cursor.pop();
        self.with_cursor(cursor)
    }

    /// Cursor to its mainline child; unchanged at a leaf.
    pub fn step_forward(&self) -> Game {
        if self.at_end() {
            return self.clone();
        }
        let mut cursor = self.cursor.clone();
        cursor.push(0);
        self.with_cursor(cursor)
    }

    pub fn to_beginning(&self) -> Game {
        self.with_cursor(Vec::new())
    }

    /// Follow first children from the cursor down to a leaf.
    pub fn to_end_of_variation(&self) -> Game {
        let mut cursor = self.cursor.clone();
        let mut node = self.cursor();
        while let Some(next) = node.mainline() {
            cursor.push(0);
            node = next.as_ref();
        }
        self.with_cursor(cursor)
    }

    /// Last node of the mainline.
    pub fn to_end(&self) -> Game {
        self.to_beginning().to_end_of_variation()
    }
}
