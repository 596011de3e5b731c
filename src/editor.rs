//! Editing session.
//!
//! [`Editor`] owns the active document and routes every change through the
//! same path: apply, then run the post-mutation hooks. The footnote
//! maintainer is always the first hook, so numbering is consistent before
//! any other hook looks at the document.
//!
//! Hooks never fail the change that triggered them. Their errors are
//! logged and the document keeps whatever state the hook left it in.
//! Changes made by hooks do not trigger hooks again.
//!
//! ```
//! use folio_engine::editor::Editor;
//! use folio_engine::replace::ReplaceRequest;
//!
//! let mut editor = Editor::from_markup("<p>The cat sat</p>").unwrap();
//! let outcome = editor.replace(&ReplaceRequest::new("cat", "dog")).unwrap();
//! assert_eq!(outcome.count(), 1);
//! assert_eq!(editor.to_markup(), "<p>The dog sat</p>");
//! ```

use crate::config::EngineConfig;
use crate::document::{ChangeEvent, Document, DocumentTree, Selection, Transaction};
use crate::error::Result;
use crate::footnotes::FootnoteMaintainer;
use crate::import::{self, InferredDocument};
use crate::mapper::PositionMapper;
use crate::replace::{self, map_match, ReplaceOutcome, ReplaceRequest};
use crate::search::{Match, SearchOptions, SearchSession};
use std::path::Path;

/// Hook run after every change to the document.
pub trait PostEffect: std::fmt::Debug {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Bring the document back to a consistent state.
    fn after_change(&mut self, doc: &mut Document) -> Result<()>;
}

impl PostEffect for FootnoteMaintainer {
    fn name(&self) -> &str {
        "footnotes"
    }

    fn after_change(&mut self, doc: &mut Document) -> Result<()> {
        self.maintain(doc).map(|_| ())
    }
}

/// The active document plus everything that acts on it.
#[derive(Debug)]
pub struct Editor {
    document: Document,
    config: EngineConfig,
    session: SearchSession,
    footnotes: FootnoteMaintainer,
    effects: Vec<Box<dyn PostEffect>>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Editor {
    /// Editor with an empty document.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    /// Editor over an existing document. Footnotes are normalized right
    /// away so the insertion counter is correct.
    pub fn with_document(document: Document, config: EngineConfig) -> Self {
        let mut editor = Self {
            document,
            footnotes: FootnoteMaintainer::from_config(&config),
            config,
            session: SearchSession::default(),
            effects: Vec::new(),
        };
        editor.run_effects();
        editor
    }

    /// Editor over a document parsed from markup, with default settings.
    pub fn from_markup(markup: &str) -> Result<Self> {
        Ok(Self::with_document(Document::from_markup(markup)?, EngineConfig::default()))
    }

    /// Register an extra hook. Hooks run in registration order, after the
    /// footnote maintainer.
    pub fn add_effect(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.push(effect);
    }

    /// The active document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The find/replace session.
    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    /// Number the next inserted footnote will get.
    pub fn next_footnote_number(&self) -> u32 {
        self.footnotes.next_number()
    }

    /// Serialize the active document.
    pub fn to_markup(&self) -> String {
        self.document.to_markup()
    }

    /// Move the selection.
    pub fn set_selection(&mut self, selection: Selection) -> Result<()> {
        self.document.set_selection(selection)
    }

    fn run_effects(&mut self) {
        match self.footnotes.maintain(&mut self.document) {
            Ok(report) if !report.is_noop() => log::debug!("Footnote maintenance: {:?}", report),
            Ok(_) => {},
            Err(e) => log::warn!("Post-effect footnotes failed: {}", e),
        }
        for effect in &mut self.effects {
            if let Err(e) = effect.after_change(&mut self.document) {
                log::warn!("Post-effect {} failed: {}", effect.name(), e);
            }
        }
    }

    /// Apply a transaction and run the hooks.
    ///
    /// Search results refer to the old text, so the session's matches are
    /// dropped; the pattern is kept.
    pub fn apply(&mut self, transaction: Transaction) -> Result<ChangeEvent> {
        let event = self.document.apply(transaction)?;
        self.session.reset();
        self.run_effects();
        Ok(event)
    }

    /// Replace the whole document with parsed markup. Invalid markup leaves
    /// the current document untouched.
    pub fn load_markup(&mut self, markup: &str) -> Result<ChangeEvent> {
        let event = self.document.replace_with_markup(markup)?;
        self.session.reset();
        self.run_effects();
        Ok(event)
    }

    /// Start a search. Returns the number of matches and selects the
    /// first one.
    pub fn find(&mut self, pattern: &str, options: SearchOptions) -> Result<usize> {
        self.session.set_pattern(pattern, options);
        let count = self.refresh_session()?;
        if count > 0 {
            self.select_current()?;
        }
        Ok(count)
    }

    fn refresh_session(&mut self) -> Result<usize> {
        let mapper = PositionMapper::new(&self.document);
        self.session.refresh(mapper.text())
    }

    /// Select the next match, wrapping around at the end.
    pub fn find_next(&mut self) -> Result<Option<Match>> {
        if self.session.matches().is_empty() {
            self.refresh_session()?;
            if self.session.current().is_some() {
                return self.select_current();
            }
        }
        if self.session.next().is_none() {
            return Ok(None);
        }
        self.select_current()
    }

    /// Select the previous match, wrapping around at the start.
    pub fn find_previous(&mut self) -> Result<Option<Match>> {
        if self.session.matches().is_empty() {
            self.refresh_session()?;
        }
        if self.session.previous().is_none() {
            return Ok(None);
        }
        self.select_current()
    }

    fn select_current(&mut self) -> Result<Option<Match>> {
        let current = match self.session.current() {
            Some(m) => m.clone(),
            None => return Ok(None),
        };
        let mapper = PositionMapper::new(&self.document);
        let (from, to) = map_match(&mapper, &current)?;
        self.document.set_selection(Selection::new(from, to))?;
        Ok(Some(current))
    }

    /// Run a replace pass, then the hooks.
    pub fn replace(&mut self, request: &ReplaceRequest) -> Result<ReplaceOutcome> {
        let outcome = replace::replace(&mut self.document, request, &mut self.session)?;
        if let ReplaceOutcome::Replaced(count) = outcome {
            log::info!("Replaced {} occurrences of {:?}", count, request.pattern);
            self.run_effects();
        }
        Ok(outcome)
    }

    /// Insert a footnote marker at `pos` with the next free number and
    /// append its note.
    pub fn insert_footnote(&mut self, pos: usize, text: &str) -> Result<u32> {
        let id = self.footnotes.insert_footnote(&mut self.document, pos, text)?;
        self.session.reset();
        self.run_effects();
        Ok(id)
    }

    /// Insert a footnote at the start of the selection.
    pub fn insert_footnote_at_selection(&mut self, text: &str) -> Result<u32> {
        let pos = self.document.selection().from();
        self.insert_footnote(pos, text)
    }

    /// Import PDF bytes, replacing the document. On failure the current
    /// document is left as it was.
    pub fn import_pdf(&mut self, bytes: &[u8]) -> Result<InferredDocument> {
        let inferred = import::import_pdf(bytes, &self.config)?;
        self.install(&inferred);
        Ok(inferred)
    }

    /// Import a PDF file, replacing the document.
    pub fn import_pdf_file(&mut self, path: impl AsRef<Path>) -> Result<InferredDocument> {
        let inferred = import::import_pdf_file(path, &self.config)?;
        self.install(&inferred);
        Ok(inferred)
    }

    fn install(&mut self, inferred: &InferredDocument) {
        self.document.replace_blocks(inferred.to_blocks());
        self.session.reset();
        self.run_effects();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, BlockKind, MarkSet, Step};
    use crate::error::Error;
    use crate::replace::ReplaceMode;
    use std::cell::Cell;
    use std::rc::Rc;

    fn note_ids(editor: &Editor) -> Vec<u32> {
        editor
            .document()
            .blocks()
            .iter()
            .filter_map(|b| match b.kind {
                BlockKind::FootnoteNote { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    #[derive(Debug)]
    struct Counter(Rc<Cell<usize>>);

    impl PostEffect for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn after_change(&mut self, _doc: &mut Document) -> Result<()> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl PostEffect for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn after_change(&mut self, _doc: &mut Document) -> Result<()> {
            Err(Error::InvalidTransaction("always fails".into()))
        }
    }

    #[test]
    fn test_footnotes_normalized_on_open() {
        let editor = Editor::from_markup(
            "<p>A<footnote-ref id=\"4\"/></p><footnote id=\"4\">n</footnote><footnote id=\"9\">x</footnote>",
        )
        .unwrap();
        assert_eq!(
            editor.to_markup(),
            "<p>A<footnote-ref id=\"1\"/></p><footnote id=\"1\">n</footnote>"
        );
        assert_eq!(editor.next_footnote_number(), 2);
    }

    #[test]
    fn test_insert_footnotes_sequentially() {
        let mut editor = Editor::from_markup("<p>Hello world</p>").unwrap();
        assert_eq!(editor.insert_footnote(6, "first").unwrap(), 1);
        assert_eq!(editor.insert_footnote(13, "second").unwrap(), 2);
        assert_eq!(note_ids(&editor), vec![1, 2]);
        assert_eq!(editor.next_footnote_number(), 3);
    }

    #[test]
    fn test_deleting_marker_removes_note() {
        let mut editor = Editor::from_markup("<p>Hello</p>").unwrap();
        editor.insert_footnote(6, "note").unwrap();
        assert_eq!(note_ids(&editor), vec![1]);

        // The marker sits at position 6, right after "Hello"
        editor
            .apply(Transaction::new().step(Step::DeleteRange { from: 6, to: 7 }))
            .unwrap();
        assert!(note_ids(&editor).is_empty());
        assert_eq!(editor.next_footnote_number(), 1);
    }

    #[test]
    fn test_find_cycles_and_selects() {
        let mut editor = Editor::from_markup("<p>cat</p><p>a cat</p>").unwrap();
        assert_eq!(editor.find("cat", SearchOptions::default()).unwrap(), 2);
        assert_eq!(editor.document().selection(), Selection::new(1, 4));

        let second = editor.find_next().unwrap().unwrap();
        assert_eq!(second.start, 5);
        assert_eq!(editor.document().selection(), Selection::new(8, 11));

        let wrapped = editor.find_next().unwrap().unwrap();
        assert_eq!(wrapped.start, 0);

        let back = editor.find_previous().unwrap().unwrap();
        assert_eq!(back.start, 5);
    }

    #[test]
    fn test_find_without_matches() {
        let mut editor = Editor::from_markup("<p>cat</p>").unwrap();
        assert_eq!(editor.find("dog", SearchOptions::default()).unwrap(), 0);
        assert_eq!(editor.find_next().unwrap(), None);
        assert_eq!(editor.find_previous().unwrap(), None);
    }

    #[test]
    fn test_session_refreshed_after_edit() {
        let mut editor = Editor::from_markup("<p>cat cat</p>").unwrap();
        editor.find("cat", SearchOptions::default()).unwrap();
        editor
            .apply(Transaction::new().delete(1, 5))
            .unwrap();
        assert!(editor.session().matches().is_empty());

        let found = editor.find_next().unwrap().unwrap();
        assert_eq!(found.start, 0);
        assert_eq!(editor.session().matches().len(), 1);
    }

    #[test]
    fn test_replace_reapply() {
        let mut editor = Editor::from_markup("<p>The <b>cat</b> sat, the cat ran</p>").unwrap();
        editor.set_selection(Selection::new(5, 8)).unwrap();
        let request = ReplaceRequest::new("cat", "dog").with_mode(ReplaceMode::ReapplyStyle);
        assert_eq!(editor.replace(&request).unwrap(), ReplaceOutcome::Replaced(2));
        assert_eq!(
            editor.to_markup(),
            "<p>The <b>dog</b> sat, the <b>dog</b> ran</p>"
        );
    }

    #[test]
    fn test_failed_import_keeps_document() {
        let mut editor = Editor::from_markup("<p>Keep me</p>").unwrap();
        let err = editor.import_pdf(b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert_eq!(editor.to_markup(), "<p>Keep me</p>");
    }

    #[test]
    fn test_invalid_markup_keeps_document() {
        let mut editor = Editor::from_markup("<p>Keep me</p>").unwrap();
        assert!(editor.load_markup("<p>unclosed").is_err());
        assert_eq!(editor.to_markup(), "<p>Keep me</p>");
    }

    #[test]
    fn test_effects_run_after_each_change() {
        let calls = Rc::new(Cell::new(0));
        let mut editor = Editor::from_markup("<p>cat</p>").unwrap();
        editor.add_effect(Box::new(Counter(Rc::clone(&calls))));
        editor.add_effect(Box::new(Failing));

        editor
            .apply(Transaction::new().insert_text(4, "s", MarkSet::new()))
            .unwrap();
        editor.replace(&ReplaceRequest::new("cats", "dogs")).unwrap();
        // No matches: no change, no hooks
        editor.replace(&ReplaceRequest::new("bird", "fish")).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(editor.to_markup(), "<p>dogs</p>");
    }

    #[test]
    fn test_insert_at_selection() {
        let mut editor = Editor::with_document(
            Document::from_blocks(vec![Block::paragraph("Hi")]),
            EngineConfig::default(),
        );
        editor.set_selection(Selection::collapsed(3)).unwrap();
        editor.insert_footnote_at_selection("n").unwrap();
        assert_eq!(
            editor.to_markup(),
            "<p>Hi<footnote-ref id=\"1\"/></p><footnote id=\"1\">n</footnote>"
        );
    }
}
