//! Flattened text view and position mapping.
//!
//! The flattened view concatenates every text leaf of a document snapshot in
//! order. Offsets into it are byte offsets; structural positions are the
//! tree addresses described in [`crate::document`].
//!
//! A [`PositionMapper`] is built from one snapshot and must be rebuilt after
//! every mutation. It never patches itself.

use crate::document::DocumentTree;
use crate::error::{Error, Result};

/// Which leaf a boundary offset resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bias {
    /// End of the previous leaf (used for range ends)
    Before,
    /// Start of the next leaf
    #[default]
    After,
}

/// Span of one leaf in both coordinate systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafSpan {
    /// Offset of the leaf's first byte in the flattened text
    pub offset: usize,
    /// Leaf length in bytes
    pub len: usize,
    /// Structural position of the leaf's first byte
    pub pos: usize,
}

impl LeafSpan {
    fn offset_end(&self) -> usize {
        self.offset + self.len
    }

    fn pos_end(&self) -> usize {
        self.pos + self.len
    }
}

/// Flattened text of a document snapshot plus the offset/position mapping.
#[derive(Debug, Clone)]
pub struct PositionMapper {
    text: String,
    spans: Vec<LeafSpan>,
    content_size: usize,
    start_position: usize,
}

impl PositionMapper {
    /// Build the flattened view of a document snapshot.
    pub fn new<D: DocumentTree + ?Sized>(doc: &D) -> Self {
        let leaves = doc.leaves();
        let mut text = String::with_capacity(leaves.iter().map(|l| l.text.len()).sum());
        let mut spans = Vec::with_capacity(leaves.len());

        for leaf in &leaves {
            spans.push(LeafSpan {
                offset: text.len(),
                len: leaf.text.len(),
                pos: leaf.pos,
            });
            text.push_str(&leaf.text);
        }

        Self {
            text,
            spans,
            content_size: doc.content_size(),
            start_position: doc.start_position(),
        }
    }

    /// The flattened text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Flattened text length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the document has no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Leaf spans in order.
    pub fn spans(&self) -> &[LeafSpan] {
        &self.spans
    }

    /// Map a flattened offset to a structural position.
    ///
    /// An offset on a leaf boundary resolves to the start of the next leaf.
    pub fn offset_to_position(&self, offset: usize) -> Result<usize> {
        self.offset_to_position_biased(offset, Bias::After)
    }

    /// Map a flattened offset to a structural position with an explicit
    /// boundary rule.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `offset` is past the end of the text.
    pub fn offset_to_position_biased(&self, offset: usize, bias: Bias) -> Result<usize> {
        if offset > self.len() {
            return Err(Error::OutOfRange {
                value: offset,
                limit: self.len(),
            });
        }

        // Index of the first span ending after `offset`.
        let idx = self.spans.partition_point(|span| span.offset_end() <= offset);

        if bias == Bias::Before && offset > 0 {
            // Index of the first span ending at or after `offset`.
            let before = self.spans.partition_point(|span| span.offset_end() < offset);
            if let Some(span) = self.spans.get(before) {
                if span.offset < offset {
                    return Ok(span.pos + (offset - span.offset));
                }
            }
        }

        match self.spans.get(idx) {
            Some(span) => Ok(span.pos + (offset - span.offset)),
            // offset == len: end of the last leaf
            None => Ok(self
                .spans
                .last()
                .map(LeafSpan::pos_end)
                .unwrap_or(self.start_position)),
        }
    }

    /// Map a structural position to a flattened offset.
    ///
    /// Positions between leaves (block boundaries, atoms) map to the offset
    /// of the next leaf.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `pos` is past the end of the document.
    pub fn position_to_offset(&self, pos: usize) -> Result<usize> {
        if pos > self.content_size {
            return Err(Error::OutOfRange {
                value: pos,
                limit: self.content_size,
            });
        }

        // First span ending at or after `pos`.
        let idx = self.spans.partition_point(|span| span.pos_end() < pos);
        match self.spans.get(idx) {
            Some(span) if span.pos <= pos => Ok(span.offset + (pos - span.pos)),
            Some(span) => Ok(span.offset),
            None => Ok(self.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, BlockKind, Document, Mark, MarkSet};

    fn sample() -> Document {
        // "The " @1, "cat" @5, " sat" @8, "Next" @14
        Document::from_blocks(vec![
            Block::new(BlockKind::Paragraph)
                .with_text("The ", MarkSet::new())
                .with_text("cat", [Mark::Bold].into_iter().collect())
                .with_text(" sat", MarkSet::new()),
            Block::paragraph("Next"),
        ])
    }

    #[test]
    fn test_flattened_text() {
        let mapper = PositionMapper::new(&sample());
        assert_eq!(mapper.text(), "The cat satNext");
        assert_eq!(mapper.len(), 15);
        assert_eq!(mapper.spans().len(), 4);
    }

    #[test]
    fn test_offset_to_position() {
        let mapper = PositionMapper::new(&sample());
        assert_eq!(mapper.offset_to_position(0).unwrap(), 1);
        assert_eq!(mapper.offset_to_position(2).unwrap(), 3);
        assert_eq!(mapper.offset_to_position(5).unwrap(), 6);
        assert_eq!(mapper.offset_to_position(15).unwrap(), 18);
    }

    #[test]
    fn test_boundary_resolves_to_next_leaf() {
        let mapper = PositionMapper::new(&sample());
        // offset 11 ends " sat" and starts "Next"
        assert_eq!(mapper.offset_to_position(11).unwrap(), 14);
        assert_eq!(mapper.offset_to_position_biased(11, Bias::Before).unwrap(), 12);
        // within a block both leaves share the boundary position
        assert_eq!(mapper.offset_to_position_biased(4, Bias::Before).unwrap(), 5);
        assert_eq!(mapper.offset_to_position(4).unwrap(), 5);
    }

    #[test]
    fn test_out_of_range() {
        let mapper = PositionMapper::new(&sample());
        assert!(matches!(
            mapper.offset_to_position(16),
            Err(Error::OutOfRange { value: 16, limit: 15 })
        ));
        assert!(mapper.position_to_offset(100).is_err());
    }

    #[test]
    fn test_position_to_offset() {
        let mapper = PositionMapper::new(&sample());
        assert_eq!(mapper.position_to_offset(1).unwrap(), 0);
        assert_eq!(mapper.position_to_offset(6).unwrap(), 5);
        assert_eq!(mapper.position_to_offset(12).unwrap(), 11);
        // block boundary and inter-block position map to the next leaf
        assert_eq!(mapper.position_to_offset(13).unwrap(), 11);
        assert_eq!(mapper.position_to_offset(0).unwrap(), 0);
        assert_eq!(mapper.position_to_offset(19).unwrap(), 15);
    }

    #[test]
    fn test_round_trip_every_offset() {
        let doc = Document::from_blocks(vec![
            Block::paragraph("ab").with_marker(1).with_text("cd", MarkSet::new()),
            Block::page_break(),
            Block::heading(2, "héllo"),
            Block::new(BlockKind::Paragraph),
            Block::paragraph("z"),
        ]);
        let mapper = PositionMapper::new(&doc);
        for offset in 0..=mapper.len() {
            let pos = mapper.offset_to_position(offset).unwrap();
            assert_eq!(mapper.position_to_offset(pos).unwrap(), offset, "offset {}", offset);
        }
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::from_blocks(vec![Block::new(BlockKind::Paragraph)]);
        let mapper = PositionMapper::new(&doc);
        assert!(mapper.is_empty());
        assert_eq!(mapper.offset_to_position(0).unwrap(), 1);
        assert_eq!(mapper.position_to_offset(1).unwrap(), 0);
        assert!(mapper.offset_to_position(1).is_err());
    }
}
