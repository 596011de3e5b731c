//! Hierarchical document model.
//!
//! The editor's document is an ordered list of blocks (paragraphs, headings,
//! footnote notes, page breaks) holding inline text runs and footnote marker
//! atoms. Text runs carry a [`MarkSet`].
//!
//! ## Structural positions
//!
//! Positions address the tree linearly:
//! - entering or leaving a text block costs 1
//! - every UTF-8 byte of text costs 1
//! - an inline atom (footnote marker) costs 1
//! - a page break costs 1 in total
//!
//! Positions are only valid for the revision they were computed against.
//! Any applied [`Transaction`] shifts everything after the edit.
//!
//! The engine talks to the tree through [`DocumentTree`]; [`Document`] is the
//! in-memory implementation.

mod markup;
mod marks;
mod transaction;
mod tree;

pub use markup::{parse_markup, serialize_markup};
pub use marks::{Mark, MarkKind, MarkSet};
pub use transaction::{ChangeEvent, Step, Transaction};
pub use tree::{Block, BlockKind, Document, Inline, TextRun};

use crate::error::Result;

/// A node visited by in-order traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    /// Structural position where the node starts
    pub pos: usize,
    /// Structural size of the node
    pub size: usize,
    /// What the node is
    pub kind: NodeKind,
}

/// Node payload seen by traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A block; its content starts at `pos + 1`
    Block(BlockKind),
    /// A text leaf
    Text {
        /// Leaf text
        text: String,
        /// Marks on the leaf
        marks: MarkSet,
    },
    /// An inline footnote marker
    FootnoteMarker {
        /// Footnote number
        id: u32,
    },
}

/// A text leaf with its structural start position.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Structural position of the first byte
    pub pos: usize,
    /// Leaf text
    pub text: String,
    /// Marks on the leaf
    pub marks: MarkSet,
}

impl Leaf {
    /// Structural position just past the last byte.
    pub fn end(&self) -> usize {
        self.pos + self.text.len()
    }
}

/// Selection endpoints as structural positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Fixed end
    pub anchor: usize,
    /// Moving end
    pub head: usize,
}

impl Selection {
    /// Selection between two positions.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Collapsed selection (a cursor).
    pub fn collapsed(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    /// Lower endpoint.
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Upper endpoint.
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Whether the selection is a cursor.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }
}

/// Contract the engine needs from a document tree.
pub trait DocumentTree {
    /// All nodes in document order.
    fn nodes(&self) -> Vec<NodeEntry>;

    /// Total structural size.
    fn content_size(&self) -> usize;

    /// Current selection.
    fn selection(&self) -> Selection;

    /// Move the selection. Fails if either end is past the content.
    fn set_selection(&mut self, selection: Selection) -> Result<()>;

    /// Apply a transaction atomically. Either every step applies or the
    /// document is unchanged.
    fn apply(&mut self, transaction: Transaction) -> Result<ChangeEvent>;

    /// Serialize to markup.
    fn to_markup(&self) -> String;

    /// Replace the whole document with parsed markup.
    fn replace_with_markup(&mut self, markup: &str) -> Result<ChangeEvent>;

    /// Text leaves in document order.
    fn leaves(&self) -> Vec<Leaf> {
        self.nodes()
            .into_iter()
            .filter_map(|node| match node.kind {
                NodeKind::Text { text, marks } => Some(Leaf {
                    pos: node.pos,
                    text,
                    marks,
                }),
                _ => None,
            })
            .collect()
    }

    /// Text between two positions. Atoms and block boundaries contribute nothing.
    fn text_between(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        for leaf in self.leaves() {
            let lo = from.max(leaf.pos);
            let hi = to.min(leaf.end());
            if lo < hi {
                if let Some(slice) = leaf.text.get(lo - leaf.pos..hi - leaf.pos) {
                    out.push_str(slice);
                }
            }
        }
        out
    }

    /// Marks shared by all text between two positions.
    ///
    /// For an empty range, the marks of the leaf the position sits in (or
    /// right after) are returned.
    fn marks_between(&self, from: usize, to: usize) -> MarkSet {
        let leaves = self.leaves();
        if from == to {
            return leaves
                .iter()
                .find(|leaf| leaf.pos < from && from <= leaf.end())
                .or_else(|| leaves.iter().find(|leaf| leaf.pos == from))
                .map(|leaf| leaf.marks.clone())
                .unwrap_or_default();
        }

        let mut common: Option<MarkSet> = None;
        for leaf in leaves.iter().filter(|leaf| leaf.pos < to && leaf.end() > from) {
            common = Some(match common {
                Some(set) => set.intersection(&leaf.marks),
                None => leaf.marks.clone(),
            });
        }
        common.unwrap_or_default()
    }

    /// First cursor position: start of the first text leaf, else inside the
    /// first text block, else 0.
    fn start_position(&self) -> usize {
        let nodes = self.nodes();
        if let Some(leaf) = nodes.iter().find(|n| matches!(n.kind, NodeKind::Text { .. })) {
            return leaf.pos;
        }
        nodes
            .iter()
            .find_map(|n| match &n.kind {
                NodeKind::Block(kind) if kind.is_textblock() => Some(n.pos + 1),
                _ => None,
            })
            .unwrap_or(0)
    }
}
