//! End-to-end checks of the engine's documented guarantees.

use folio_engine::config::EngineConfig;
use folio_engine::document::{Block, BlockKind, Document, DocumentTree, NodeKind, Selection};
use folio_engine::footnotes::FootnoteMaintainer;
use folio_engine::import::{import_pdf, infer_structure, InferredBlock, TextRun};
use folio_engine::replace::{replace, ReplaceMode, ReplaceOutcome, ReplaceRequest};
use folio_engine::search::{SearchOptions, SearchSession, TextSearcher};
use folio_engine::{Error, PositionMapper};
use proptest::prelude::*;

fn marker_ids(doc: &Document) -> Vec<u32> {
    doc.nodes()
        .into_iter()
        .filter_map(|node| match node.kind {
            NodeKind::FootnoteMarker { id } => Some(id),
            _ => None,
        })
        .collect()
}

fn note_ids(doc: &Document) -> Vec<u32> {
    doc.blocks()
        .iter()
        .filter_map(|block| match block.kind {
            BlockKind::FootnoteNote { id } => Some(id),
            _ => None,
        })
        .collect()
}

fn footnote_doc(markers: &[u32], notes: &[u32]) -> Document {
    let mut blocks: Vec<Block> = markers
        .iter()
        .map(|&id| Block::paragraph("text").with_marker(id))
        .collect();
    blocks.extend(notes.iter().map(|&id| Block::footnote_note(id, "note")));
    Document::from_blocks(blocks)
}

fn document_strategy() -> impl Strategy<Value = Document> {
    let block = (
        prop::collection::vec("[a-z ]{0,6}", 0..4),
        prop::bool::ANY,
        prop::bool::ANY,
    )
        .prop_map(|(runs, marker, page_break)| {
            if page_break {
                return Block::page_break();
            }
            let mut block = Block::new(BlockKind::Paragraph);
            for (i, run) in runs.into_iter().enumerate() {
                let marks = if i % 2 == 0 {
                    Default::default()
                } else {
                    [folio_engine::document::Mark::Italic].into_iter().collect()
                };
                block = block.with_text(run, marks);
                if marker && i == 0 {
                    block = block.with_marker(1);
                }
            }
            block
        });
    prop::collection::vec(block, 0..6).prop_map(Document::from_blocks)
}

mod mapping {
    use super::*;

    proptest! {
        #[test]
        fn offset_position_round_trip(doc in document_strategy()) {
            let mapper = PositionMapper::new(&doc);
            for offset in 0..=mapper.len() {
                let pos = mapper.offset_to_position(offset).unwrap();
                prop_assert_eq!(mapper.position_to_offset(pos).unwrap(), offset);
            }
        }

        #[test]
        fn past_the_end_is_out_of_range(doc in document_strategy()) {
            let mapper = PositionMapper::new(&doc);
            let is_out_of_range = matches!(
                mapper.offset_to_position(mapper.len() + 1),
                Err(Error::OutOfRange { .. })
            );
            prop_assert!(is_out_of_range);
        }
    }
}

mod footnotes {
    use super::*;

    proptest! {
        #[test]
        fn markers_sequential_and_paired(
            markers in prop::collection::vec(1u32..12, 0..8),
            notes in prop::collection::vec(1u32..12, 0..8),
        ) {
            let mut doc = footnote_doc(&markers, &notes);
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
        fn second_pass_is_noop(
            markers in prop::collection::vec(1u32..12, 0..8),
            notes in prop::collection::vec(1u32..12, 0..8),
        ) {
            let mut doc = footnote_doc(&markers, &notes);
            let mut maintainer = FootnoteMaintainer::default();
            maintainer.maintain(&mut doc).unwrap();
            let after_first = doc.to_markup();

            let report = maintainer.maintain(&mut doc).unwrap();
            prop_assert!(report.is_noop());
            prop_assert_eq!(doc.to_markup(), after_first);
        }
    }

    #[test]
    fn orphan_note_three_deleted() {
        let mut doc = footnote_doc(&[1, 2], &[1, 2, 3]);
        FootnoteMaintainer::default().maintain(&mut doc).unwrap();
        assert_eq!(note_ids(&doc), vec![1, 2]);
    }
}

mod replacing {
    use super::*;

    #[test]
    fn reapply_style_from_selection() {
        let mut doc = Document::from_markup("<p>The <b>cat</b> sat, the cat ran</p>").unwrap();
        doc.set_selection(Selection::new(5, 8)).unwrap();
        let mut session = SearchSession::default();

        let request = ReplaceRequest::new("cat", "dog").with_mode(ReplaceMode::ReapplyStyle);
        let outcome = replace(&mut doc, &request, &mut session).unwrap();

        assert_eq!(outcome, ReplaceOutcome::Replaced(2));
        assert_eq!(doc.to_markup(), "<p>The <b>dog</b> sat, the <b>dog</b> ran</p>");
        assert_eq!(doc.selection(), Selection::collapsed(doc.start_position()));
        assert!(session.matches().is_empty());
        assert_eq!(session.pattern(), "cat");
    }

    #[test]
    fn preserve_style_keeps_enclosing_marks() {
        let mut doc = Document::from_markup("<p>The <b>cat</b> sat</p>").unwrap();
        let outcome = replace(
            &mut doc,
            &ReplaceRequest::new("cat", "dog"),
            &mut SearchSession::default(),
        )
        .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Replaced(1));
        assert_eq!(doc.to_markup(), "<p>The <b>dog</b> sat</p>");
    }

    #[test]
    fn no_matches_is_not_an_error() {
        let mut doc = Document::from_markup("<p>The cat sat</p>").unwrap();
        let before = doc.clone();
        let outcome = replace(
            &mut doc,
            &ReplaceRequest::new("bird", "fish"),
            &mut SearchSession::default(),
        )
        .unwrap();
        assert_eq!(outcome, ReplaceOutcome::NoMatches);
        assert_eq!(doc, before);
    }
}

mod searching {
    use super::*;

    #[test]
    fn whole_word_skips_inside_words() {
        let opts = SearchOptions::default().with_whole_words(true);
        let matches = TextSearcher::find_all("a cat in a category", "cat", &opts).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].start, matches[0].end), (2, 5));
    }

    #[test]
    fn blocks_join_without_separator() {
        let doc = Document::from_markup("<p>cat</p><p>dog</p>").unwrap();
        let mapper = PositionMapper::new(&doc);
        assert_eq!(mapper.text(), "catdog");

        let opts = SearchOptions::default().with_whole_words(true);
        assert!(TextSearcher::find_all(mapper.text(), "cat", &opts).unwrap().is_empty());
        assert_eq!(TextSearcher::find_all(mapper.text(), "cat", &SearchOptions::default()).unwrap().len(), 1);
    }

    #[test]
    fn case_insensitive_by_default() {
        let matches = TextSearcher::find_all("Cat CAT cat", "cat", &SearchOptions::default()).unwrap();
        assert_eq!(matches.len(), 3);

        let exact = SearchOptions::default().with_match_case(true);
        assert_eq!(TextSearcher::find_all("Cat CAT cat", "cat", &exact).unwrap().len(), 1);
    }
}

mod importing {
    use super::*;

    fn run(text: &str, y: f32, size: f32) -> TextRun {
        TextRun::new(text, y, size, "Times-Roman")
    }

    #[test]
    fn equal_y_runs_merge() {
        let doc = infer_structure(
            &[vec![run("one ", 500.0, 11.0), run("two", 500.0, 11.0)]],
            &EngineConfig::default(),
        );
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].text(), "one two");
    }

    #[test]
    fn size_twenty_is_heading_two() {
        let doc = infer_structure(
            &[vec![run("Body", 600.0, 11.0), run("Chapter", 500.0, 20.0)]],
            &EngineConfig::default(),
        );
        assert!(matches!(&doc.blocks[1], InferredBlock::Heading { level: 2, text, .. } if text == "Chapter"));
    }

    #[test]
    fn oversized_input_rejected() {
        let bytes = vec![b' '; 52_533_658];
        assert!(matches!(
            import_pdf(&bytes, &EngineConfig::default()),
            Err(Error::FileTooLarge { .. })
        ));
    }
}
