//! Heading and paragraph inference from positioned text runs.
//!
//! Runs are grouped into lines by baseline: a run whose Y differs from the
//! previous run's Y by more than the configured tolerance starts a new
//! line. Each line is classified by its dominant font size (the size that
//! covers the most text bytes).

use crate::config::EngineConfig;
use crate::document::{Block, Document, DocumentTree};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref RE_BOLD_FONT: Regex =
        Regex::new(r"(?i)bold|black|heavy|semibold|demi").unwrap();
}

/// A positioned piece of text from a page's content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Decoded text, `None` for runs that produced nothing
    pub text: Option<String>,
    /// Baseline Y in page space
    pub y: f32,
    /// Effective font size
    pub font_size: f32,
    /// Base font name
    pub font_name: String,
}

impl TextRun {
    /// Convenience constructor.
    pub fn new(text: impl Into<String>, y: f32, font_size: f32, font_name: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            y,
            font_size,
            font_name: font_name.into(),
        }
    }

    /// Whether the font name denotes a bold face.
    pub fn is_bold(&self) -> bool {
        RE_BOLD_FONT.is_match(&self.font_name)
    }
}

/// A block inferred from page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InferredBlock {
    /// Heading line
    Heading {
        /// Heading level (2 or 3)
        level: u8,
        /// Line text
        text: String,
        /// Every run on the line used a bold face
        bold: bool,
    },
    /// Body line
    Paragraph {
        /// Line text
        text: String,
        /// Every run on the line used a bold face
        bold: bool,
    },
    /// Boundary between two pages
    PageBreak,
}

impl InferredBlock {
    /// Text of the block; empty for page breaks.
    pub fn text(&self) -> &str {
        match self {
            InferredBlock::Heading { text, .. } | InferredBlock::Paragraph { text, .. } => text,
            InferredBlock::PageBreak => "",
        }
    }

    fn to_block(&self) -> Block {
        match self {
            InferredBlock::Heading { level, text, .. } => Block::heading(*level, text.as_str()),
            InferredBlock::Paragraph { text, .. } => Block::paragraph(text.as_str()),
            InferredBlock::PageBreak => Block::page_break(),
        }
    }
}

/// Result of structural inference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferredDocument {
    /// Blocks in input order
    pub blocks: Vec<InferredBlock>,
    /// Number of pages the blocks came from
    pub page_count: usize,
}

impl InferredDocument {
    /// Convert to document blocks.
    pub fn to_blocks(&self) -> Vec<Block> {
        self.blocks.iter().map(InferredBlock::to_block).collect()
    }

    /// Build a document.
    pub fn to_document(&self) -> Document {
        Document::from_blocks(self.to_blocks())
    }

    /// Serialize to markup.
    pub fn to_markup(&self) -> String {
        self.to_document().to_markup()
    }
}

/// Runs collected for the current line.
#[derive(Debug, Default)]
struct LineBuffer {
    text: String,
    /// (font size, bytes of text in that size), in first-seen order
    sizes: Vec<(f32, usize)>,
    all_bold: bool,
    runs: usize,
}

impl LineBuffer {
    fn push(&mut self, text: &str, run: &TextRun) {
        self.text.push_str(text);
        match self.sizes.iter_mut().find(|(size, _)| *size == run.font_size) {
            Some((_, bytes)) => *bytes += text.len(),
            None => self.sizes.push((run.font_size, text.len())),
        }
        self.all_bold = if self.runs == 0 {
            run.is_bold()
        } else {
            self.all_bold && run.is_bold()
        };
        self.runs += 1;
    }

    /// Size covering the most bytes; the first seen wins a tie.
    fn dominant_size(&self) -> f32 {
        let mut best: Option<(f32, usize)> = None;
        for &(size, bytes) in &self.sizes {
            if best.map_or(true, |(_, best_bytes)| bytes > best_bytes) {
                best = Some((size, bytes));
            }
        }
        best.map_or(0.0, |(size, _)| size)
    }

    fn flush(&mut self, config: &EngineConfig, blocks: &mut Vec<InferredBlock>) {
        let line = std::mem::take(self);
        let text = line.text.trim();
        if text.is_empty() {
            return;
        }

        let size = line.dominant_size();
        let text = text.to_string();
        let bold = line.all_bold;
        let block = if size > config.h2_min_font_size {
            InferredBlock::Heading { level: 2, text, bold }
        } else if size > config.h3_min_font_size {
            InferredBlock::Heading { level: 3, text, bold }
        } else {
            InferredBlock::Paragraph { text, bold }
        };
        blocks.push(block);
    }
}

/// Infer headings, paragraphs and page breaks from per-page text runs.
///
/// Page order and run order are preserved. A page break is emitted between
/// consecutive pages, never after the last one.
pub fn infer_structure(pages: &[Vec<TextRun>], config: &EngineConfig) -> InferredDocument {
    let mut blocks = Vec::new();

    for (index, runs) in pages.iter().enumerate() {
        let mut line = LineBuffer::default();
        let mut last_y: Option<f32> = None;

        for run in runs {
            let text = match run.text.as_deref() {
                Some(text) if !text.is_empty() => text,
                _ => continue,
            };
            if last_y.is_some_and(|y| (run.y - y).abs() > config.line_tolerance) {
                line.flush(config, &mut blocks);
            }
            line.push(text, run);
            last_y = Some(run.y);
        }
        line.flush(config, &mut blocks);

        if index + 1 < pages.len() {
            blocks.push(InferredBlock::PageBreak);
        }
    }

    log::debug!("Inferred {} blocks from {} pages", blocks.len(), pages.len());
    InferredDocument {
        blocks,
        page_count: pages.len(),
    }
}
