//! Footnote numbering maintenance.
//!
//! After every change the markers are renumbered 1..N and each marker is
//! paired with exactly one note:
//!
//! - markers are ordered by their current number, ties broken by document
//!   order, and numbered 1..N in that order
//! - notes follow the first marker that carried their old number
//! - notes with no marker, and second notes for one number, are deleted
//! - a marker with no note gets an empty note appended to the document
//!
//! Renumbering goes through a temporary id namespace so swaps and cycles
//! never produce two items with the same number mid-transaction.

use crate::config::EngineConfig;
use crate::document::{Block, BlockKind, DocumentTree, NodeKind, Step, Transaction};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};

/// What a maintenance pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Markers and notes that got a new number
    pub renumbered: usize,
    /// Notes deleted as orphans or duplicates
    pub removed: usize,
    /// Empty notes appended for markers without one
    pub added: usize,
}

impl MaintenanceReport {
    /// Whether the pass left the document alone.
    pub fn is_noop(&self) -> bool {
        self.renumbered == 0 && self.removed == 0 && self.added == 0
    }
}

#[derive(Debug)]
struct Item {
    pos: usize,
    id: u32,
}

/// Keeps footnote numbering consistent and hands out new numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteMaintainer {
    next_number: u32,
    temp_base: u32,
}

impl Default for FootnoteMaintainer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl FootnoteMaintainer {
    /// Maintainer with an explicit temporary namespace base.
    pub fn new(temp_base: u32) -> Self {
        Self {
            next_number: 1,
            temp_base,
        }
    }

    /// Maintainer configured from engine settings.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.footnote_temp_base)
    }

    /// Number the next inserted footnote will get.
    pub fn next_number(&self) -> u32 {
        self.next_number
    }

    /// Renumber markers, pair notes and update the insertion counter.
    pub fn maintain<D: DocumentTree + ?Sized>(&mut self, doc: &mut D) -> Result<MaintenanceReport> {
        let mut markers = Vec::new();
        let mut notes = Vec::new();
        for node in doc.nodes() {
            match node.kind {
                NodeKind::FootnoteMarker { id } => markers.push(Item { pos: node.pos, id }),
                NodeKind::Block(BlockKind::FootnoteNote { id }) => {
                    notes.push(Item { pos: node.pos, id })
                },
                _ => {},
            }
        }

        // Rank by (old number, document order).
        let mut order: Vec<usize> = (0..markers.len()).collect();
        order.sort_by_key(|&idx| (markers[idx].id, idx));
        let mut new_numbers = vec![0u32; markers.len()];
        for (rank, &idx) in order.iter().enumerate() {
            new_numbers[idx] = rank as u32 + 1;
        }

        // A note follows the first marker (in ranking) that held its number.
        let mut note_target: HashMap<u32, u32> = HashMap::new();
        for &idx in &order {
            note_target.entry(markers[idx].id).or_insert(new_numbers[idx]);
        }

        let mut kept_notes: Vec<(&Item, u32)> = Vec::new();
        let mut removed_notes: Vec<&Item> = Vec::new();
        let mut claimed: HashSet<u32> = HashSet::new();
        for note in &notes {
            match note_target.get(&note.id) {
                Some(&target) if claimed.insert(note.id) => {
                    kept_notes.push((note, target))
                },
                _ => removed_notes.push(note),
            }
        }

        let count = markers.len() as u32;
        let mut missing: Vec<u32> = (1..=count).collect();
        missing.retain(|n| !kept_notes.iter().any(|(_, target)| target == n));

        let relabels: Vec<(usize, u32)> = markers
            .iter()
            .zip(&new_numbers)
            .filter(|(marker, new)| marker.id != **new)
            .map(|(marker, new)| (marker.pos, *new))
            .chain(
                kept_notes
                    .iter()
                    .filter(|(note, target)| note.id != *target)
                    .map(|(note, target)| (note.pos, *target)),
            )
            .collect();

        self.next_number = count + 1;

        let report = MaintenanceReport {
            renumbered: relabels.len(),
            removed: removed_notes.len(),
            added: missing.len(),
        };
        if report.is_noop() {
            return Ok(report);
        }

        let mut transaction = Transaction::new();
        for &(pos, new) in &relabels {
            let temp = self.temp_base.checked_add(new).ok_or_else(|| {
                Error::InvalidTransaction(format!("footnote {} overflows the temporary namespace", new))
            })?;
            transaction.push(Step::SetFootnoteId { pos, id: temp });
        }
        for &(pos, new) in &relabels {
            transaction.push(Step::SetFootnoteId { pos, id: new });
        }
        // Back to front so earlier positions stay valid.
        for note in removed_notes.iter().rev() {
            transaction.push(Step::DeleteBlock { pos: note.pos });
        }
        for &id in &missing {
            transaction.push(Step::AppendBlock {
                block: Block::new(BlockKind::FootnoteNote { id }),
            });
        }

        doc.apply(transaction)?;
        log::debug!(
            "Footnotes: {} renumbered, {} notes removed, {} notes added, next number {}",
            report.renumbered,
            report.removed,
            report.added,
            self.next_number
        );
        Ok(report)
    }

    /// Insert a footnote marker at `pos` with the next number and append its
    /// note. Returns the number used.
    pub fn insert_footnote<D: DocumentTree + ?Sized>(
        &mut self,
        doc: &mut D,
        pos: usize,
        text: &str,
    ) -> Result<u32> {
        let id = self.next_number;
        doc.apply(
            Transaction::new()
                .step(Step::InsertFootnoteMarker { pos, id })
                .step(Step::AppendBlock {
                    block: Block::footnote_note(id, text),
                }),
        )?;
        self.next_number += 1;
        log::debug!("Inserted footnote {} at {}", id, pos);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Inline};
    use proptest::prelude::*;

    fn marker_ids(doc: &Document) -> Vec<u32> {
        doc.nodes()
            .into_iter()
            .filter_map(|n| match n.kind {
                NodeKind::FootnoteMarker { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    fn note_ids(doc: &Document) -> Vec<u32> {
        doc.blocks()
            .iter()
            .filter_map(|b| match b.kind {
                BlockKind::FootnoteNote { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_sequential_is_noop() {
        let mut doc = Document::from_markup(
            r#"<p>a<footnote-ref id="1"/>b<footnote-ref id="2"/></p><footnote id="1">x</footnote><footnote id="2">y</footnote>"#,
        )
        .unwrap();
        let mut maintainer = FootnoteMaintainer::default();
        let report = maintainer.maintain(&mut doc).unwrap();
        assert!(report.is_noop());
        assert_eq!(doc.revision(), 0);
        assert_eq!(maintainer.next_number(), 3);
    }

    #[test]
    fn test_orphan_note_removed() {
        let mut doc = Document::from_markup(
            r#"<p>a<footnote-ref id="1"/></p><footnote id="1">x</footnote><footnote id="3">orphan</footnote>"#,
        )
        .unwrap();
        let report = FootnoteMaintainer::default().maintain(&mut doc).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(note_ids(&doc), vec![1]);
    }

    #[test]
    fn test_renumber_gaps() {
        let mut doc = Document::from_markup(
            r#"<p>a<footnote-ref id="2"/>b<footnote-ref id="5"/></p><footnote id="2">two</footnote><footnote id="5">five</footnote>"#,
        )
        .unwrap();
        FootnoteMaintainer::default().maintain(&mut doc).unwrap();
        assert_eq!(marker_ids(&doc), vec![1, 2]);
        assert_eq!(
            doc.to_markup(),
            r#"<p>a<footnote-ref id="1"/>b<footnote-ref id="2"/></p><footnote id="1">two</footnote><footnote id="2">five</footnote>"#
        );
    }

    #[test]
    fn test_ordering_by_number_not_position() {
        // Marker 2 appears before marker 1; numbers are kept.
        let mut doc = Document::from_markup(
            r#"<p>a<footnote-ref id="2"/>b<footnote-ref id="1"/></p><footnote id="1">one</footnote><footnote id="2">two</footnote>"#,
        )
        .unwrap();
        let report = FootnoteMaintainer::default().maintain(&mut doc).unwrap();
        assert!(report.is_noop());
        assert_eq!(marker_ids(&doc), vec![2, 1]);
    }

    #[test]
    fn test_swap_through_temporary_namespace() {
        // 3 -> 2 and 2 -> 1
        let mut doc = Document::from_markup(
            r#"<p><footnote-ref id="3"/><footnote-ref id="2"/></p><footnote id="2">two</footnote><footnote id="3">three</footnote>"#,
        )
        .unwrap();
        FootnoteMaintainer::default().maintain(&mut doc).unwrap();
        assert_eq!(marker_ids(&doc), vec![2, 1]);
        let blocks = doc.blocks();
        assert_eq!(blocks[1].kind, BlockKind::FootnoteNote { id: 1 });
        assert_eq!(blocks[1].text(), "two");
        assert_eq!(blocks[2].kind, BlockKind::FootnoteNote { id: 2 });
        assert_eq!(blocks[2].text(), "three");
    }

    #[test]
    fn test_duplicate_marker_gets_own_number_and_note() {
        let mut doc = Document::from_markup(
            r#"<p><footnote-ref id="1"/><footnote-ref id="1"/></p><footnote id="1">one</footnote><footnote id="1">dup</footnote>"#,
        )
        .unwrap();
        let report = FootnoteMaintainer::default().maintain(&mut doc).unwrap();
        assert_eq!(marker_ids(&doc), vec![1, 2]);
        assert_eq!(report.removed, 1);
        assert_eq!(report.added, 1);
        assert_eq!(note_ids(&doc), vec![1, 2]);
        assert_eq!(doc.blocks()[1].text(), "one");
    }

    #[test]
    fn test_missing_note_appended() {
        let mut doc = Document::from_markup(r#"<p>a<footnote-ref id="1"/></p>"#).unwrap();
        let report = FootnoteMaintainer::default().maintain(&mut doc).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(note_ids(&doc), vec![1]);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut doc = Document::from_markup(
            r#"<p><footnote-ref id="7"/>x<footnote-ref id="4"/><footnote-ref id="4"/></p><footnote id="9">z</footnote><footnote id="4">four</footnote>"#,
        )
        .unwrap();
        let mut maintainer = FootnoteMaintainer::default();
        maintainer.maintain(&mut doc).unwrap();
        let snapshot = doc.clone();
        assert!(maintainer.maintain(&mut doc).unwrap().is_noop());
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn test_insert_footnote_uses_counter() {
        let mut doc = Document::from_markup(
            r#"<p>Text<footnote-ref id="1"/></p><footnote id="1">one</footnote>"#,
        )
        .unwrap();
        let mut maintainer = FootnoteMaintainer::default();
        maintainer.maintain(&mut doc).unwrap();
        let id = maintainer.insert_footnote(&mut doc, 3, "new note").unwrap();
        assert_eq!(id, 2);
        assert_eq!(doc.blocks()[0].inlines[1], Inline::FootnoteMarker { id: 2 });
        assert!(maintainer.maintain(&mut doc).unwrap().is_noop());
        assert_eq!(doc.blocks().last().map(|b| b.text()), Some("new note".to_string()));
    }

    #[test]
    fn test_temporary_namespace_overflow() {
        let mut doc = Document::from_markup(r#"<p><footnote-ref id="5"/></p>"#).unwrap();
        let mut maintainer = FootnoteMaintainer::new(u32::MAX);
        assert!(maintainer.maintain(&mut doc).is_err());
        assert_eq!(marker_ids(&doc), vec![5]);
    }

    fn build_doc(markers: &[u32], notes: &[u32]) -> Document {
        let mut para = Block::paragraph("start");
        for &id in markers {
            para = para.with_marker(id).with_text("x", Default::default());
        }
        let mut blocks = vec![para];
        blocks.extend(notes.iter().map(|&id| Block::footnote_note(id, "note")));
        Document::from_blocks(blocks)
    }

    proptest! {
        #[test]
        fn prop_markers_sequential_after_maintenance(
            markers in prop::collection::vec(1u32..8, 0..8),
            notes in prop::collection::vec(1u32..8, 0..8),
        ) {
            let mut doc = build_doc(&markers, &notes);
            let mut maintainer = FootnoteMaintainer::default();
            maintainer.maintain(&mut doc).unwrap();

            let mut ids = marker_ids(&doc);
            ids.sort_unstable();
            let expected: Vec<u32> = (1..=markers.len() as u32).collect();
            prop_assert_eq!(&ids, &expected);

            let mut notes_after = note_ids(&doc);
            notes_after.sort_unstable();
            prop_assert_eq!(&notes_after, &expected);
            prop_assert_eq!(maintainer.next_number(), markers.len() as u32 + 1);
        }

        #[test]
        fn prop_maintenance_is_idempotent(
            markers in prop::collection::vec(1u32..8, 0..8),
            notes in prop::collection::vec(1u32..8, 0..8),
        ) {
            let mut doc = build_doc(&markers, &notes);
            let mut maintainer = FootnoteMaintainer::default();
            maintainer.maintain(&mut doc).unwrap();
            let snapshot = doc.clone();
            prop_assert!(maintainer.maintain(&mut doc).unwrap().is_noop());
            prop_assert_eq!(doc, snapshot);
        }
    }
}
