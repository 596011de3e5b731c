//! In-memory document tree.

use super::marks::MarkSet;
use super::markup::{parse_markup, serialize_markup};
use super::transaction::{ChangeEvent, Step, Transaction};
use super::{DocumentTree, NodeEntry, NodeKind, Selection};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Kind of a block node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// Body paragraph
    Paragraph,
    /// Heading with level 1-6
    Heading(u8),
    /// Footnote note paragraph, rendered with its number in front
    FootnoteNote {
        /// Footnote number
        id: u32,
    },
    /// Contentless page break sentinel
    PageBreak,
}

impl BlockKind {
    /// Whether the block holds inline content.
    pub fn is_textblock(&self) -> bool {
        !matches!(self, BlockKind::PageBreak)
    }
}

/// A run of text with uniform marks.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Run text
    pub text: String,
    /// Marks on the run
    pub marks: MarkSet,
}

/// Inline node.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Marked text
    Text(TextRun),
    /// Footnote reference atom
    FootnoteMarker {
        /// Footnote number
        id: u32,
    },
}

impl Inline {
    /// Structural size.
    pub fn size(&self) -> usize {
        match self {
            Inline::Text(run) => run.text.len(),
            Inline::FootnoteMarker { .. } => 1,
        }
    }
}

/// A block node.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Block kind
    pub kind: BlockKind,
    /// Inline content (always empty for page breaks)
    pub inlines: Vec<Inline>,
}

impl Block {
    /// Empty block of a kind.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            inlines: Vec::new(),
        }
    }

    /// Paragraph with unmarked text.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Paragraph).with_text(text, MarkSet::new())
    }

    /// Heading with unmarked text.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(BlockKind::Heading(level)).with_text(text, MarkSet::new())
    }

    /// Footnote note with unmarked text.
    pub fn footnote_note(id: u32, text: impl Into<String>) -> Self {
        Self::new(BlockKind::FootnoteNote { id }).with_text(text, MarkSet::new())
    }

    /// Page break.
    pub fn page_break() -> Self {
        Self::new(BlockKind::PageBreak)
    }

    /// Append a text run.
    pub fn with_text(mut self, text: impl Into<String>, marks: MarkSet) -> Self {
        if self.kind.is_textblock() {
            self.inlines.push(Inline::Text(TextRun {
                text: text.into(),
                marks,
            }));
            self.normalize();
        }
        self
    }

    /// Append a footnote marker.
    pub fn with_marker(mut self, id: u32) -> Self {
        if self.kind.is_textblock() {
            self.inlines.push(Inline::FootnoteMarker { id });
        }
        self
    }

    /// Size of the inline content.
    pub fn content_size(&self) -> usize {
        self.inlines.iter().map(Inline::size).sum()
    }

    /// Structural size including the block's own boundaries.
    pub fn size(&self) -> usize {
        if self.kind.is_textblock() {
            self.content_size() + 2
        } else {
            1
        }
    }

    /// Plain text of the block.
    pub fn text(&self) -> String {
        self.inlines
            .iter()
            .filter_map(|inline| match inline {
                Inline::Text(run) => Some(run.text.as_str()),
                Inline::FootnoteMarker { .. } => None,
            })
            .collect()
    }

    /// Make sure an inline boundary exists at a content offset and return
    /// the index of the inline that starts there.
    fn split_at(&mut self, offset: usize) -> Result<usize> {
        let mut acc = 0;
        for idx in 0..self.inlines.len() {
            if offset == acc {
                return Ok(idx);
            }
            let size = self.inlines[idx].size();
            if offset < acc + size {
                let local = offset - acc;
                let right = match &mut self.inlines[idx] {
                    Inline::Text(run) if run.text.is_char_boundary(local) => TextRun {
                        text: run.text.split_off(local),
                        marks: run.marks.clone(),
                    },
                    _ => {
                        return Err(Error::InvalidTransaction(format!(
                            "offset {} splits a character or atom",
                            offset
                        )))
                    },
                };
                self.inlines.insert(idx + 1, Inline::Text(right));
                return Ok(idx + 1);
            }
            acc += size;
        }
        if offset == acc {
            Ok(self.inlines.len())
        } else {
            Err(Error::OutOfRange {
                value: offset,
                limit: acc,
            })
        }
    }

    fn delete_content(&mut self, from: usize, to: usize) -> Result<()> {
        let start = self.split_at(from)?;
        let end = self.split_at(to)?;
        self.inlines.drain(start..end);
        self.normalize();
        Ok(())
    }

    /// Drop empty runs and merge neighbours with equal marks.
    fn normalize(&mut self) {
        let mut out: Vec<Inline> = Vec::with_capacity(self.inlines.len());
        for inline in self.inlines.drain(..) {
            match inline {
                Inline::Text(run) if run.text.is_empty() => {},
                Inline::Text(run) => {
                    if let Some(Inline::Text(prev)) = out.last_mut() {
                        if prev.marks == run.marks {
                            prev.text.push_str(&run.text);
                            continue;
                        }
                    }
                    out.push(Inline::Text(run));
                },
                other => out.push(other),
            }
        }
        self.inlines = out;
    }
}

/// In-memory document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
    selection: Selection,
    revision: u64,
}

impl Document {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Document from blocks.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut doc = Self {
            blocks: normalized(blocks),
            selection: Selection::default(),
            revision: 0,
        };
        doc.selection = Selection::collapsed(doc.start_position());
        doc
    }

    /// Document parsed from markup.
    pub fn from_markup(markup: &str) -> Result<Self> {
        Ok(Self::from_blocks(parse_markup(markup)?))
    }

    /// Blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Current revision; bumped by every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Plain text of every block, one per line.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.kind.is_textblock())
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replace every block at once.
    pub fn replace_blocks(&mut self, blocks: Vec<Block>) -> ChangeEvent {
        let size_before = self.content_size();
        self.blocks = normalized(blocks);
        self.revision += 1;
        self.selection = Selection::collapsed(self.start_position());
        ChangeEvent {
            revision: self.revision,
            steps: 1,
            size_before,
            size_after: self.content_size(),
        }
    }
}

fn normalized(mut blocks: Vec<Block>) -> Vec<Block> {
    for block in &mut blocks {
        if block.kind.is_textblock() {
            block.normalize();
        } else {
            block.inlines.clear();
        }
    }
    blocks
}

impl DocumentTree for Document {
    fn nodes(&self) -> Vec<NodeEntry> {
        let mut nodes = Vec::new();
        let mut pos = 0;
        for block in &self.blocks {
            nodes.push(NodeEntry {
                pos,
                size: block.size(),
                kind: NodeKind::Block(block.kind.clone()),
            });
            let mut inner = pos + 1;
            for inline in &block.inlines {
                let kind = match inline {
                    Inline::Text(run) => NodeKind::Text {
                        text: run.text.clone(),
                        marks: run.marks.clone(),
                    },
                    Inline::FootnoteMarker { id } => NodeKind::FootnoteMarker { id: *id },
                };
                nodes.push(NodeEntry {
                    pos: inner,
                    size: inline.size(),
                    kind,
                });
                inner += inline.size();
            }
            pos += block.size();
        }
        nodes
    }

    fn content_size(&self) -> usize {
        self.blocks.iter().map(Block::size).sum()
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) -> Result<()> {
        let limit = self.content_size();
        if selection.to() > limit {
            return Err(Error::OutOfRange {
                value: selection.to(),
                limit,
            });
        }
        self.selection = selection;
        Ok(())
    }

    fn apply(&mut self, transaction: Transaction) -> Result<ChangeEvent> {
        let size_before = self.content_size();
        let step_count = transaction.len();

        let mut blocks = self.blocks.clone();
        for (idx, step) in transaction.into_steps().into_iter().enumerate() {
            apply_step(&mut blocks, step).map_err(|e| match e {
                Error::InvalidTransaction(msg) => {
                    Error::InvalidTransaction(format!("step {}: {}", idx, msg))
                },
                other => other,
            })?;
        }

        self.blocks = blocks;
        self.revision += 1;
        let size_after = self.content_size();
        self.selection = Selection::new(
            self.selection.anchor.min(size_after),
            self.selection.head.min(size_after),
        );

        log::debug!(
            "Applied {} steps, revision {}, size {} -> {}",
            step_count,
            self.revision,
            size_before,
            size_after
        );

        Ok(ChangeEvent {
            revision: self.revision,
            steps: step_count,
            size_before,
            size_after,
        })
    }

    fn to_markup(&self) -> String {
        serialize_markup(&self.blocks)
    }

    fn replace_with_markup(&mut self, markup: &str) -> Result<ChangeEvent> {
        let blocks = parse_markup(markup)?;
        Ok(self.replace_blocks(blocks))
    }
}

/// Locate a position inside a text block: (block index, content offset).
fn resolve(blocks: &[Block], pos: usize) -> Result<(usize, usize)> {
    let mut start = 0;
    for (idx, block) in blocks.iter().enumerate() {
        let end = start + block.size();
        if block.kind.is_textblock() && pos > start && pos < end {
            return Ok((idx, pos - start - 1));
        }
        start = end;
    }
    Err(Error::InvalidTransaction(format!("position {} is not inside a text block", pos)))
}

/// Index of the block starting exactly at `pos`.
fn block_starting_at(blocks: &[Block], pos: usize) -> Option<usize> {
    let mut start = 0;
    for (idx, block) in blocks.iter().enumerate() {
        if start == pos {
            return Some(idx);
        }
        if start > pos {
            break;
        }
        start += block.size();
    }
    None
}

fn check_range(blocks: &[Block], from: usize, to: usize) -> Result<()> {
    let limit: usize = blocks.iter().map(Block::size).sum();
    if from > to {
        return Err(Error::InvalidTransaction(format!("inverted range {}..{}", from, to)));
    }
    if to > limit {
        return Err(Error::OutOfRange { value: to, limit });
    }
    Ok(())
}

/// Run `f` on the marks of every text run inside `from..to`, splitting runs
/// at the range edges.
fn update_marks<F>(blocks: &mut [Block], from: usize, to: usize, f: F) -> Result<()>
where
    F: Fn(&mut MarkSet),
{
    check_range(blocks, from, to)?;
    let mut start = 0;
    for block in blocks.iter_mut() {
        let size = block.size();
        if block.kind.is_textblock() {
            let content_start = start + 1;
            let content_end = start + size - 1;
            let lo = from.max(content_start);
            let hi = to.min(content_end);
            if lo < hi {
                let first = block.split_at(lo - content_start)?;
                let last = block.split_at(hi - content_start)?;
                for inline in &mut block.inlines[first..last] {
                    if let Inline::Text(run) = inline {
                        f(&mut run.marks);
                    }
                }
                block.normalize();
            }
        }
        start += size;
    }
    Ok(())
}

fn apply_step(blocks: &mut Vec<Block>, step: Step) -> Result<()> {
    match step {
        Step::DeleteRange { from, to } => {
            check_range(blocks, from, to)?;
            if from == to {
                return Ok(());
            }
            let (first, first_offset) = resolve(blocks, from)?;
            let (last, last_offset) = resolve(blocks, to)?;
            if first == last {
                return blocks[first].delete_content(first_offset, last_offset);
            }

            let first_size = blocks[first].content_size();
            blocks[first].delete_content(first_offset, first_size)?;
            blocks[last].delete_content(0, last_offset)?;
            let tail: Vec<Inline> = blocks[last].inlines.drain(..).collect();
            blocks.drain(first + 1..=last);
            blocks[first].inlines.extend(tail);
            blocks[first].normalize();
            Ok(())
        },
        Step::InsertText { pos, text, marks } => {
            if text.is_empty() {
                return Ok(());
            }
            let (idx, offset) = resolve(blocks, pos)?;
            let block = &mut blocks[idx];
            let at = block.split_at(offset)?;
            block.inlines.insert(at, Inline::Text(TextRun { text, marks }));
            block.normalize();
            Ok(())
        },
        Step::ClearMarks { from, to } => update_marks(blocks, from, to, MarkSet::clear),
        Step::AddMark { from, to, mark } => {
            update_marks(blocks, from, to, |marks| mark.apply_to(marks))
        },
        Step::InsertFootnoteMarker { pos, id } => {
            let (idx, offset) = resolve(blocks, pos)?;
            let block = &mut blocks[idx];
            let at = block.split_at(offset)?;
            block.inlines.insert(at, Inline::FootnoteMarker { id });
            Ok(())
        },
        Step::SetFootnoteId { pos, id } => {
            if let Some(idx) = block_starting_at(blocks, pos) {
                if let BlockKind::FootnoteNote { id: note_id } = &mut blocks[idx].kind {
                    *note_id = id;
                    return Ok(());
                }
            }
            let (idx, offset) = resolve(blocks, pos)?;
            let mut acc = 0;
            for inline in &mut blocks[idx].inlines {
                if acc == offset {
                    if let Inline::FootnoteMarker { id: marker_id } = inline {
                        *marker_id = id;
                        return Ok(());
                    }
                }
                acc += inline.size();
                if acc > offset {
                    break;
                }
            }
            Err(Error::InvalidTransaction(format!("no footnote marker or note at {}", pos)))
        },
        Step::DeleteBlock { pos } => match block_starting_at(blocks, pos) {
            Some(idx) => {
                blocks.remove(idx);
                Ok(())
            },
            None => Err(Error::InvalidTransaction(format!("no block starts at {}", pos))),
        },
        Step::AppendBlock { mut block } => {
            if block.kind.is_textblock() {
                block.normalize();
            } else {
                block.inlines.clear();
            }
            blocks.push(block);
            Ok(())
        },
    }
}
