//! Find-and-replace over a document.
//!
//! Two modes are supported:
//!
//! - [`ReplaceMode::PreserveStyle`] substitutes inside the text nodes of
//!   the document's markup and reloads it. Replaced text keeps the marks of
//!   the element it sits in.
//! - [`ReplaceMode::ReapplyStyle`] captures one mark set, then replaces
//!   every occurrence through a single transaction and stamps the captured
//!   marks onto each replacement.
//!
//! Either way a pass is all-or-nothing: an error leaves the document as it
//! was.

use crate::document::{DocumentTree, MarkSet, Selection, Step, Transaction};
use crate::error::{Error, Result};
use crate::mapper::{Bias, PositionMapper};
use crate::search::{Match, SearchOptions, SearchSession, TextSearcher};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How replaced text gets its marks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// Keep the marks of the surrounding element
    #[default]
    PreserveStyle,
    /// Apply one captured mark set to every replacement
    ReapplyStyle,
}

/// A replace-all request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceRequest {
    /// Search pattern (a regular expression)
    pub pattern: String,
    /// Literal replacement text
    pub replacement: String,
    /// Search options
    #[serde(default)]
    pub options: SearchOptions,
    /// Replace mode
    #[serde(default)]
    pub mode: ReplaceMode,
}

impl ReplaceRequest {
    /// Preserve-style request with default options.
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            options: SearchOptions::default(),
            mode: ReplaceMode::default(),
        }
    }

    /// Set search options.
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the replace mode.
    pub fn with_mode(mut self, mode: ReplaceMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Result of a replace pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Number of occurrences replaced
    Replaced(usize),
    /// The pattern did not occur
    NoMatches,
}

impl ReplaceOutcome {
    /// Number of occurrences replaced.
    pub fn count(&self) -> usize {
        match self {
            ReplaceOutcome::Replaced(count) => *count,
            ReplaceOutcome::NoMatches => 0,
        }
    }
}

/// Where a captured style came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    /// The selection covers exactly one occurrence of the pattern
    Selection,
    /// The first occurrence with at least one mark (index into the matches)
    Occurrence(usize),
    /// Nothing styled was found
    Empty,
}

/// A captured mark set.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleCapture {
    /// Marks to apply
    pub marks: MarkSet,
    /// Where they came from
    pub source: CaptureSource,
}

/// Structural range of a match, with the boundary rule applied to each end.
pub fn map_match(mapper: &PositionMapper, m: &Match) -> Result<(usize, usize)> {
    let start = mapper.offset_to_position(m.start)?;
    let end = if m.is_empty() {
        start
    } else {
        mapper.offset_to_position_biased(m.end, Bias::Before)?
    };
    Ok((start, end))
}

/// Capture the style to reapply.
///
/// A non-empty selection whose text is itself a match of `regex` wins.
/// Otherwise the first occurrence carrying any marks is used. If neither
/// exists the capture is empty.
pub fn capture_style<D: DocumentTree + ?Sized>(
    doc: &D,
    mapper: &PositionMapper,
    matches: &[Match],
    regex: &Regex,
) -> Result<StyleCapture> {
    let selection = doc.selection();
    if !selection.is_empty() {
        let selected = doc.text_between(selection.from(), selection.to());
        if TextSearcher::matches_whole(&selected, regex) {
            return Ok(StyleCapture {
                marks: doc.marks_between(selection.from(), selection.to()),
                source: CaptureSource::Selection,
            });
        }
    }

    for (idx, m) in matches.iter().enumerate() {
        let (start, end) = map_match(mapper, m)?;
        let marks = doc.marks_between(start, end);
        if !marks.is_empty() {
            return Ok(StyleCapture {
                marks,
                source: CaptureSource::Occurrence(idx),
            });
        }
    }

    Ok(StyleCapture {
        marks: MarkSet::new(),
        source: CaptureSource::Empty,
    })
}

/// Replace every occurrence of the request's pattern.
///
/// On success the session is reset to the request's pattern and the
/// selection collapses to the start of the document.
pub fn replace<D: DocumentTree + ?Sized>(
    doc: &mut D,
    request: &ReplaceRequest,
    session: &mut SearchSession,
) -> Result<ReplaceOutcome> {
    let outcome = match request.mode {
        ReplaceMode::PreserveStyle => replace_preserving(doc, request)?,
        ReplaceMode::ReapplyStyle => replace_reapplying(doc, request)?,
    };

    session.set_pattern(request.pattern.clone(), request.options);
    if let ReplaceOutcome::Replaced(_) = outcome {
        doc.set_selection(Selection::collapsed(doc.start_position()))?;
    }
    Ok(outcome)
}

fn replace_reapplying<D: DocumentTree + ?Sized>(
    doc: &mut D,
    request: &ReplaceRequest,
) -> Result<ReplaceOutcome> {
    if request.pattern.is_empty() {
        return Ok(ReplaceOutcome::NoMatches);
    }
    let regex = TextSearcher::build_regex(&request.pattern, &request.options)?;
    let mapper = PositionMapper::new(doc);
    let matches = TextSearcher::find_all_with(mapper.text(), &regex);
    if matches.is_empty() {
        log::debug!("No matches for {:?}", request.pattern);
        return Ok(ReplaceOutcome::NoMatches);
    }

    let capture = capture_style(doc, &mapper, &matches, &regex)?;
    match capture.source {
        CaptureSource::Empty => log::debug!("No styled occurrence; replacing without marks"),
        source => log::debug!("Captured {} marks from {:?}", capture.marks.len(), source),
    }

    // Every match is mapped before anything changes.
    let ranges = matches
        .iter()
        .map(|m| map_match(&mapper, m))
        .collect::<Result<Vec<_>>>()?;

    let inserted = request.replacement.len();
    let mut transaction = Transaction::new();
    let mut delta: isize = 0;
    for (start, end) in ranges {
        let from = shift(start, delta)?;
        let to = shift(end, delta)?;
        let steps = [
            Step::DeleteRange { from, to },
            Step::InsertText {
                pos: from,
                text: request.replacement.clone(),
                marks: MarkSet::new(),
            },
        ];
        delta += steps.iter().filter_map(Step::static_size_delta).sum::<isize>();
        for step in steps {
            transaction.push(step);
        }

        transaction.push(Step::ClearMarks {
            from,
            to: from + inserted,
        });
        for mark in &capture.marks {
            transaction.push(Step::AddMark {
                from,
                to: from + inserted,
                mark: mark.clone(),
            });
        }
    }

    let count = matches.len();
    let event = doc.apply(transaction)?;
    log::info!(
        "Replaced {} occurrences of {:?} (reapply), size {} -> {}",
        count,
        request.pattern,
        event.size_before,
        event.size_after
    );
    Ok(ReplaceOutcome::Replaced(count))
}

fn shift(pos: usize, delta: isize) -> Result<usize> {
    pos.checked_add_signed(delta).ok_or_else(|| {
        Error::InvalidTransaction(format!("position {} shifted by {} underflows", pos, delta))
    })
}

fn replace_preserving<D: DocumentTree + ?Sized>(
    doc: &mut D,
    request: &ReplaceRequest,
) -> Result<ReplaceOutcome> {
    let text = PositionMapper::new(doc).text().to_string();
    let matches = TextSearcher::find_all(&text, &request.pattern, &request.options)?;
    if matches.is_empty() {
        log::debug!("No matches for {:?}", request.pattern);
        return Ok(ReplaceOutcome::NoMatches);
    }

    let (markup, count) = substitute_text_nodes(&doc.to_markup(), &matches, &request.replacement)?;
    if count < matches.len() {
        log::debug!(
            "{} of {} matches cross element boundaries and were left alone",
            matches.len() - count,
            matches.len()
        );
    }
    if count == 0 {
        return Ok(ReplaceOutcome::NoMatches);
    }

    doc.replace_with_markup(&markup)?;
    log::info!("Replaced {} occurrences of {:?} (preserve)", count, request.pattern);
    Ok(ReplaceOutcome::Replaced(count))
}

/// Rewrite markup, replacing every match that lies entirely inside one text
/// node. Text nodes inside blocks line up with the flattened text, so match
/// offsets can be located node by node.
///
/// Returns the new markup and the number of substitutions made.
fn substitute_text_nodes(
    markup: &str,
    matches: &[Match],
    replacement: &str,
) -> Result<(String, usize)> {
    let xml_error = |e: quick_xml::Error| Error::InvalidMarkup(e.to_string());

    let mut reader = Reader::from_str(markup);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(markup.len()));

    let mut depth = 0usize;
    let mut offset = 0usize;
    let mut next = 0usize;
    let mut count = 0usize;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::Eof => break,
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(ref e) if depth > 0 => {
                let text = e.unescape().map_err(xml_error)?;
                let node_end = offset + text.len();

                let mut out = String::with_capacity(text.len());
                let mut cursor = 0;
                while let Some(m) = matches.get(next) {
                    // A zero-width match at a node end belongs to the next
                    // node, so one after the last text node is dropped.
                    // Reapply-style still inserts there.
                    if m.start >= node_end || m.end > node_end {
                        break;
                    }
                    if m.start < offset {
                        // started in an earlier node
                        next += 1;
                        continue;
                    }
                    let local_start = m.start - offset;
                    out.push_str(&text[cursor..local_start]);
                    out.push_str(replacement);
                    cursor = m.end - offset;
                    count += 1;
                    next += 1;
                }
                out.push_str(&text[cursor..]);
                offset = node_end;

                writer
                    .write_event(Event::Text(BytesText::new(&out)))
                    .map_err(xml_error)?;
                continue;
            },
            _ => {},
        }
        writer.write_event(event).map_err(xml_error)?;
    }

    let markup = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::InvalidMarkup(e.to_string()))?;
    Ok((markup, count))
}
