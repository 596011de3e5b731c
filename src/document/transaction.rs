//! Document transactions.
//!
//! A [`Transaction`] is an ordered list of [`Step`]s applied as one unit.
//! Each step addresses the document as left by the steps before it, so
//! callers that plan several edits up front must shift later positions by
//! the size change of earlier ones.

use super::marks::{Mark, MarkSet};
use super::tree::Block;

/// One primitive document edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Delete content between two positions, joining blocks if the range
    /// crosses a block boundary.
    DeleteRange {
        /// Start position
        from: usize,
        /// End position
        to: usize,
    },
    /// Insert a text run carrying the given marks.
    InsertText {
        /// Insertion position
        pos: usize,
        /// Text to insert
        text: String,
        /// Marks on the inserted run
        marks: MarkSet,
    },
    /// Remove every mark from the text in a range.
    ClearMarks {
        /// Start position
        from: usize,
        /// End position
        to: usize,
    },
    /// Add one mark to the text in a range.
    AddMark {
        /// Start position
        from: usize,
        /// End position
        to: usize,
        /// Mark to add
        mark: Mark,
    },
    /// Insert a footnote marker atom.
    InsertFootnoteMarker {
        /// Insertion position
        pos: usize,
        /// Footnote number
        id: u32,
    },
    /// Change the number of the footnote marker or footnote note at `pos`.
    SetFootnoteId {
        /// Position of the marker, or the position before the note block
        pos: usize,
        /// New number
        id: u32,
    },
    /// Delete the block that starts at `pos`.
    DeleteBlock {
        /// Position before the block
        pos: usize,
    },
    /// Append a block at the end of the document.
    AppendBlock {
        /// Block to append
        block: Block,
    },
}

impl Step {
    /// Change in content size this step causes, if it can be known without
    /// looking at the document.
    pub fn static_size_delta(&self) -> Option<isize> {
        match self {
            Step::InsertText { text, .. } => Some(text.len() as isize),
            Step::InsertFootnoteMarker { .. } => Some(1),
            Step::ClearMarks { .. } | Step::AddMark { .. } | Step::SetFootnoteId { .. } => {
                Some(0)
            },
            Step::DeleteRange { from, to } => Some(-((to - from) as isize)),
            Step::AppendBlock { block } => Some(block.size() as isize),
            Step::DeleteBlock { .. } => None,
        }
    }
}

/// An ordered list of steps applied atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    steps: Vec<Step>,
}

impl Transaction {
    /// Create an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a step in place.
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Delete a range.
    pub fn delete(self, from: usize, to: usize) -> Self {
        self.step(Step::DeleteRange { from, to })
    }

    /// Insert text with marks.
    pub fn insert_text(self, pos: usize, text: impl Into<String>, marks: MarkSet) -> Self {
        self.step(Step::InsertText {
            pos,
            text: text.into(),
            marks,
        })
    }

    /// Add a mark over a range.
    pub fn add_mark(self, from: usize, to: usize, mark: Mark) -> Self {
        self.step(Step::AddMark { from, to, mark })
    }

    /// Clear marks over a range.
    pub fn clear_marks(self, from: usize, to: usize) -> Self {
        self.step(Step::ClearMarks { from, to })
    }

    /// Steps in application order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Consume into steps.
    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    /// Whether the transaction has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Notification emitted once per applied transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Document revision after the change
    pub revision: u64,
    /// Number of steps applied
    pub steps: usize,
    /// Content size before the change
    pub size_before: usize,
    /// Content size after the change
    pub size_after: usize,
}

impl ChangeEvent {
    /// Net content size change.
    pub fn size_delta(&self) -> isize {
        self.size_after as isize - self.size_before as isize
    }
}
