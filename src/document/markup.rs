//! Markup serialization for documents.
//!
//! The markup is a small XML dialect close to the editor's HTML:
//!
//! ```text
//! <h2>Title</h2>
//! <p>The <b>cat</b> sat<footnote-ref id="1"/></p>
//! <page-break/>
//! <footnote id="1">A note.</footnote>
//! ```
//!
//! Marks map to `<b> <i> <u> <s> <code>` and to `<span>` attributes
//! (`data-color`, `data-highlight`, `data-font-family`, `data-font-size`,
//! `data-tag`).

use super::marks::{Mark, MarkSet};
use super::tree::{Block, BlockKind, Inline, TextRun};
use crate::error::{Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Serialize blocks to markup.
pub fn serialize_markup(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        let tag = match &block.kind {
            BlockKind::PageBreak => {
                out.push_str("<page-break/>");
                continue;
            },
            BlockKind::Paragraph => {
                out.push_str("<p>");
                "p".to_string()
            },
            BlockKind::Heading(level) => {
                out.push_str(&format!("<h{}>", level));
                format!("h{}", level)
            },
            BlockKind::FootnoteNote { id } => {
                out.push_str(&format!("<footnote id=\"{}\">", id));
                "footnote".to_string()
            },
        };
        for inline in &block.inlines {
            match inline {
                Inline::Text(run) => write_run(&mut out, run),
                Inline::FootnoteMarker { id } => {
                    out.push_str(&format!("<footnote-ref id=\"{}\"/>", id));
                },
            }
        }
        out.push_str(&format!("</{}>", tag));
    }
    out
}

fn write_run(out: &mut String, run: &TextRun) {
    let mut closers = Vec::with_capacity(run.marks.len());
    for mark in &run.marks {
        let (open, close) = mark_tags(mark);
        out.push_str(&open);
        closers.push(close);
    }
    out.push_str(&escape(run.text.as_str()));
    for close in closers.iter().rev() {
        out.push_str(close);
    }
}

fn mark_tags(mark: &Mark) -> (String, &'static str) {
    let span = |attr: &str, value: &str| format!("<span {}=\"{}\">", attr, escape(value));
    match mark {
        Mark::Bold => ("<b>".to_string(), "</b>"),
        Mark::Italic => ("<i>".to_string(), "</i>"),
        Mark::Underline => ("<u>".to_string(), "</u>"),
        Mark::Strike => ("<s>".to_string(), "</s>"),
        Mark::Code => ("<code>".to_string(), "</code>"),
        Mark::Color { value } => (span("data-color", value), "</span>"),
        Mark::Highlight { value } => (span("data-highlight", value), "</span>"),
        Mark::FontFamily { value } => (span("data-font-family", value), "</span>"),
        Mark::FontSize { value } => (span("data-font-size", value), "</span>"),
        Mark::SemanticTag { name } => (span("data-tag", name), "</span>"),
    }
}

fn markup_error(reader: &Reader<&[u8]>, message: impl std::fmt::Display) -> Error {
    Error::InvalidMarkup(format!("{} at byte {}", message, reader.buffer_position()))
}

/// Read the numeric `id` attribute of a footnote element.
fn footnote_id(element: &BytesStart<'_>) -> Option<u32> {
    element
        .attributes()
        .filter_map(|attr| attr.ok())
        .find(|attr| attr.key.as_ref() == b"id")
        .and_then(|attr| attr.unescape_value().ok().and_then(|v| v.trim().parse().ok()))
}

/// Marks contributed by an inline formatting element, or `None` if the
/// element is not a formatting element.
fn element_marks(element: &BytesStart<'_>) -> Result<Option<Vec<Mark>>> {
    let marks = match element.name().as_ref() {
        b"b" | b"strong" => vec![Mark::Bold],
        b"i" | b"em" => vec![Mark::Italic],
        b"u" => vec![Mark::Underline],
        b"s" | b"del" => vec![Mark::Strike],
        b"code" => vec![Mark::Code],
        b"span" => {
            let mut marks = Vec::new();
            for attr in element.attributes() {
                let attr = attr.map_err(|e| Error::InvalidMarkup(e.to_string()))?;
                let value = attr
                    .unescape_value()
                    .map_err(|e| Error::InvalidMarkup(e.to_string()))?
                    .into_owned();
                match attr.key.as_ref() {
                    b"data-color" => marks.push(Mark::Color { value }),
                    b"data-highlight" => marks.push(Mark::Highlight { value }),
                    b"data-font-family" => marks.push(Mark::FontFamily { value }),
                    b"data-font-size" => marks.push(Mark::FontSize { value }),
                    b"data-tag" => marks.push(Mark::SemanticTag { name: value }),
                    _ => {},
                }
            }
            marks
        },
        _ => return Ok(None),
    };
    Ok(Some(marks))
}

fn block_kind(element: &BytesStart<'_>) -> Option<BlockKind> {
    match element.name().as_ref() {
        b"p" => Some(BlockKind::Paragraph),
        b"h1" => Some(BlockKind::Heading(1)),
        b"h2" => Some(BlockKind::Heading(2)),
        b"h3" => Some(BlockKind::Heading(3)),
        b"h4" => Some(BlockKind::Heading(4)),
        b"h5" => Some(BlockKind::Heading(5)),
        b"h6" => Some(BlockKind::Heading(6)),
        b"footnote" => footnote_id(element).map(|id| BlockKind::FootnoteNote { id }),
        b"page-break" => Some(BlockKind::PageBreak),
        _ => None,
    }
}

/// Parse markup into blocks.
///
/// # Errors
///
/// Returns [`Error::InvalidMarkup`] for unknown elements, text outside a
/// block, nested blocks, unbalanced tags, or footnote elements without a
/// numeric `id`.
pub fn parse_markup(markup: &str) -> Result<Vec<Block>> {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(false);

    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    let mut mark_stack: Vec<Vec<Mark>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if let Some(block) = current.as_mut() {
                    if block_kind(&e).is_some() {
                        return Err(markup_error(&reader, "nested block element"));
                    }
                    match element_marks(&e)? {
                        Some(marks) => mark_stack.push(marks),
                        None => {
                            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                            return Err(markup_error(
                                &reader,
                                format!("unknown inline element <{}> in {:?}", name, block.kind),
                            ));
                        },
                    }
                } else {
                    match block_kind(&e) {
                        Some(kind) => current = Some(Block::new(kind)),
                        None => {
                            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                            return Err(markup_error(
                                &reader,
                                format!("unknown block element <{}>", name),
                            ));
                        },
                    }
                }
            },
            Ok(Event::End(_)) => {
                if mark_stack.pop().is_none() {
                    match current.take() {
                        Some(block) => blocks.push(block),
                        None => return Err(markup_error(&reader, "unexpected closing tag")),
                    }
                }
            },
            Ok(Event::Empty(e)) => match current.as_mut() {
                Some(block) => match e.name().as_ref() {
                    b"footnote-ref" => {
                        let id = footnote_id(&e)
                            .ok_or_else(|| markup_error(&reader, "footnote-ref without id"))?;
                        block.inlines.push(Inline::FootnoteMarker { id });
                    },
                    // Empty formatting elements carry no text.
                    _ if element_marks(&e)?.is_some() => {},
                    _ => return Err(markup_error(&reader, "unknown empty inline element")),
                },
                None => match block_kind(&e) {
                    Some(kind) => blocks.push(Block::new(kind)),
                    None => return Err(markup_error(&reader, "unknown empty element")),
                },
            },
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| markup_error(&reader, err))?;
                match current.as_mut() {
                    Some(block) if block.kind.is_textblock() => {
                        let marks: MarkSet = mark_stack.iter().flatten().cloned().collect();
                        block.inlines.push(Inline::Text(TextRun {
                            text: text.into_owned(),
                            marks,
                        }));
                    },
                    Some(_) => {},
                    None if text.trim().is_empty() => {},
                    None => return Err(markup_error(&reader, "text outside a block")),
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => return Err(markup_error(&reader, e)),
        }
    }

    if current.is_some() || !mark_stack.is_empty() {
        return Err(Error::InvalidMarkup("unclosed element at end of input".to_string()));
    }

    Ok(blocks)
}
