//! Formatting and semantic marks.
//!
//! Marks form a closed set. Each variant knows how it lands on a [`MarkSet`]:
//! flag marks are simply present or absent, value marks replace any mark of
//! the same kind already in the set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A formatting or semantic annotation attached to a span of text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    /// Bold weight
    Bold,
    /// Italic style
    Italic,
    /// Underline decoration
    Underline,
    /// Strike-through decoration
    Strike,
    /// Inline code
    Code,
    /// Text color (CSS color value)
    Color {
        /// Color value
        value: String,
    },
    /// Background highlight (CSS color value)
    Highlight {
        /// Color value
        value: String,
    },
    /// Font family name
    FontFamily {
        /// Family name
        value: String,
    },
    /// Font size (CSS length)
    FontSize {
        /// Size value
        value: String,
    },
    /// Named semantic annotation
    SemanticTag {
        /// Tag name
        name: String,
    },
}

/// The kind of a mark, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkKind {
    /// See [`Mark::Bold`]
    Bold,
    /// See [`Mark::Italic`]
    Italic,
    /// See [`Mark::Underline`]
    Underline,
    /// See [`Mark::Strike`]
    Strike,
    /// See [`Mark::Code`]
    Code,
    /// See [`Mark::Color`]
    Color,
    /// See [`Mark::Highlight`]
    Highlight,
    /// See [`Mark::FontFamily`]
    FontFamily,
    /// See [`Mark::FontSize`]
    FontSize,
    /// See [`Mark::SemanticTag`]
    SemanticTag,
}

impl Mark {
    /// Kind of this mark.
    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Bold => MarkKind::Bold,
            Mark::Italic => MarkKind::Italic,
            Mark::Underline => MarkKind::Underline,
            Mark::Strike => MarkKind::Strike,
            Mark::Code => MarkKind::Code,
            Mark::Color { .. } => MarkKind::Color,
            Mark::Highlight { .. } => MarkKind::Highlight,
            Mark::FontFamily { .. } => MarkKind::FontFamily,
            Mark::FontSize { .. } => MarkKind::FontSize,
            Mark::SemanticTag { .. } => MarkKind::SemanticTag,
        }
    }

    /// Apply this mark to a set.
    pub fn apply_to(&self, set: &mut MarkSet) {
        match self {
            Mark::Bold | Mark::Italic | Mark::Underline | Mark::Strike | Mark::Code => {
                set.marks.insert(self.clone());
            },
            Mark::Color { .. }
            | Mark::Highlight { .. }
            | Mark::FontFamily { .. }
            | Mark::FontSize { .. } => {
                set.remove_kind(self.kind());
                set.marks.insert(self.clone());
            },
            // A span carries one semantic tag; the innermost wins.
            Mark::SemanticTag { .. } => {
                set.remove_kind(MarkKind::SemanticTag);
                set.marks.insert(self.clone());
            },
        }
    }
}

/// An ordered set of marks with at most one mark per kind.
///
/// Iteration order is canonical (by variant, then value), which keeps
/// serialized markup stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkSet {
    marks: BTreeSet<Mark>,
}

impl MarkSet {
    /// Create an empty mark set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set has no marks.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Number of marks.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Iterate marks in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.marks.iter()
    }

    /// Whether the set contains this exact mark.
    pub fn contains(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }

    /// Whether the set contains any mark of this kind.
    pub fn has_kind(&self, kind: MarkKind) -> bool {
        self.marks.iter().any(|m| m.kind() == kind)
    }

    /// Add a mark using the mark's own apply rule.
    pub fn insert(&mut self, mark: Mark) {
        mark.apply_to(self);
    }

    /// Remove every mark of a kind.
    pub fn remove_kind(&mut self, kind: MarkKind) {
        self.marks.retain(|m| m.kind() != kind);
    }

    /// Remove all marks.
    pub fn clear(&mut self) {
        self.marks.clear();
    }

    /// Marks present in both sets.
    pub fn intersection(&self, other: &MarkSet) -> MarkSet {
        MarkSet {
            marks: self.marks.intersection(&other.marks).cloned().collect(),
        }
    }
}

impl FromIterator<Mark> for MarkSet {
    fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
        let mut set = MarkSet::new();
        for mark in iter {
            set.insert(mark);
        }
        set
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::collections::btree_set::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.marks.iter()
    }
}
