//! Content stream parsing and text run extraction.
//!
//! Content streams use postfix notation where operands precede the operator:
//!
//! ```text
//! BT
//!   /F1 12 Tf
//!   100 700 Td
//!   (Hello, World!) Tj
//! ET
//! ```
//!
//! Only the operators that move text or change the coordinate system are
//! interpreted; everything else is parsed and ignored.

use super::lexer::{skip_ws, token, Token};
use super::object::Object;
use super::parser::{is_nesting_error, parse_object, MAX_NESTING_DEPTH};
use crate::import::TextRun;
use std::collections::HashMap;

/// TJ offsets below this (thousandths of an em) become a space.
const TJ_SPACE_THRESHOLD: f32 = -120.0;

/// Element of a TJ array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextElement {
    /// String to show
    String(Vec<u8>),
    /// Horizontal adjustment in thousandths of an em
    Offset(f32),
}

/// Content stream operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font and size (Tf)
    Tf {
        /// Font resource name
        font: String,
        /// Font size
        size: f32,
    },
    /// Move text position (Td)
    Td {
        /// Horizontal offset
        tx: f32,
        /// Vertical offset
        ty: f32,
    },
    /// Move text position and set leading (TD)
    TD {
        /// Horizontal offset
        tx: f32,
        /// Vertical offset
        ty: f32,
    },
    /// Set text matrix (Tm)
    Tm {
        /// Matrix [a b c d e f]
        matrix: Matrix,
    },
    /// Move to start of next line (T*)
    TStar,
    /// Set leading (TL)
    TL {
        /// Leading
        leading: f32,
    },
    /// Show text (Tj)
    Tj {
        /// Raw string bytes
        text: Vec<u8>,
    },
    /// Show text with adjustments (TJ)
    TJ {
        /// Strings and offsets
        array: Vec<TextElement>,
    },
    /// Next line and show text (')
    Quote {
        /// Raw string bytes
        text: Vec<u8>,
    },
    /// Set spacing, next line and show text (")
    DoubleQuote {
        /// Word spacing
        word_space: f32,
        /// Character spacing
        char_space: f32,
        /// Raw string bytes
        text: Vec<u8>,
    },
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Concatenate matrix to the CTM (cm)
    Cm {
        /// Matrix [a b c d e f]
        matrix: Matrix,
    },
    /// Any operator the extractor does not interpret
    Other {
        /// Operator name
        name: String,
    },
}

/// 2D affine matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Scale/rotate x
    pub a: f32,
    /// Rotate/skew
    pub b: f32,
    /// Rotate/skew
    pub c: f32,
    /// Scale/rotate y
    pub d: f32,
    /// Translate x
    pub e: f32,
    /// Translate y
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    /// Identity matrix.
    pub fn identity() -> Self {
        Self::translate(0.0, 0.0)
    }

    /// Translation matrix.
    pub fn translate(tx: f32, ty: f32) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    /// `self × other` (apply `self` first, then `other`).
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Vertical scale factor.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Parse a content stream into operators.
///
/// Unparseable bytes are skipped so a damaged stream still yields the
/// operators around the damage.
pub fn parse_content_stream(data: &[u8]) -> Vec<Operator> {
    let mut operators = Vec::new();
    let mut operands: Vec<Object> = Vec::new();
    let mut input = data;

    loop {
        input = skip_ws(input);
        if input.is_empty() {
            break;
        }

        match token(input) {
            Ok((rest, Token::Keyword(b"BI"))) => {
                input = skip_inline_image(rest);
                operands.clear();
            },
            Ok((rest, Token::Keyword(name))) => {
                let name = String::from_utf8_lossy(name);
                operators.push(build_operator(&name, std::mem::take(&mut operands)));
                input = rest;
            },
            _ => match parse_object(input) {
                Ok((rest, obj)) => {
                    operands.push(obj);
                    input = rest;
                },
                Err(e) if is_nesting_error(&e) => {
                    log::warn!(
                        "Content stream nests deeper than {} levels, ignoring the rest",
                        MAX_NESTING_DEPTH
                    );
                    break;
                },
                Err(_) => {
                    log::debug!("Skipping unparseable content byte {:#04x}", input[0]);
                    input = &input[1..];
                },
            },
        }
    }

    operators
}

/// Skip `<dict entries> ID <binary> EI` after `BI`.
fn skip_inline_image(input: &[u8]) -> &[u8] {
    let data_start = input
        .windows(3)
        .position(|w| w[0..2] == *b"ID" && w[2].is_ascii_whitespace())
        .map(|p| p + 3);
    let Some(start) = data_start else {
        return &[];
    };
    let body = &input[start..];
    match body
        .windows(3)
        .position(|w| w[0].is_ascii_whitespace() && w[1..3] == *b"EI")
    {
        Some(end) => &body[end + 3..],
        None => &[],
    }
}

fn number(operands: &[Object], idx: usize) -> Option<f32> {
    operands.get(idx).and_then(Object::as_number).map(|n| n as f32)
}

fn string(operands: &[Object], idx: usize) -> Vec<u8> {
    operands
        .get(idx)
        .and_then(Object::as_string)
        .map(<[u8]>::to_vec)
        .unwrap_or_default()
}

fn matrix(operands: &[Object]) -> Matrix {
    Matrix {
        a: number(operands, 0).unwrap_or(1.0),
        b: number(operands, 1).unwrap_or(0.0),
        c: number(operands, 2).unwrap_or(0.0),
        d: number(operands, 3).unwrap_or(1.0),
        e: number(operands, 4).unwrap_or(0.0),
        f: number(operands, 5).unwrap_or(0.0),
    }
}

fn build_operator(name: &str, operands: Vec<Object>) -> Operator {
    // Operands come first; the last ones belong to the operator.
    match name {
        "BT" => Operator::BeginText,
        "ET" => Operator::EndText,
        "Tf" => Operator::Tf {
            font: operands
                .first()
                .and_then(Object::as_name)
                .unwrap_or_default()
                .to_string(),
            size: number(&operands, 1).unwrap_or(0.0),
        },
        "Td" => Operator::Td {
            tx: number(&operands, 0).unwrap_or(0.0),
            ty: number(&operands, 1).unwrap_or(0.0),
        },
        "TD" => Operator::TD {
            tx: number(&operands, 0).unwrap_or(0.0),
            ty: number(&operands, 1).unwrap_or(0.0),
        },
        "Tm" => Operator::Tm {
            matrix: matrix(&operands),
        },
        "T*" => Operator::TStar,
        "TL" => Operator::TL {
            leading: number(&operands, 0).unwrap_or(0.0),
        },
        "Tj" => Operator::Tj {
            text: string(&operands, 0),
        },
        "TJ" => Operator::TJ {
            array: operands
                .first()
                .and_then(Object::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|obj| match obj {
                            Object::String(s) => Some(TextElement::String(s.clone())),
                            other => other.as_number().map(|n| TextElement::Offset(n as f32)),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        },
        "'" => Operator::Quote {
            text: string(&operands, 0),
        },
        "\"" => Operator::DoubleQuote {
            word_space: number(&operands, 0).unwrap_or(0.0),
            char_space: number(&operands, 1).unwrap_or(0.0),
            text: string(&operands, 2),
        },
        "q" => Operator::SaveState,
        "Q" => Operator::RestoreState,
        "cm" => Operator::Cm {
            matrix: matrix(&operands),
        },
        other => Operator::Other {
            name: other.to_string(),
        },
    }
}

/// Map string bytes to text through Latin-1.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Text state while walking one page's operators.
#[derive(Debug, Default)]
struct TextState {
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font: String,
    font_size: f32,
    leading: f32,
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn run(&self, text: String, fonts: &HashMap<String, String>) -> TextRun {
        let rendering = self.text_matrix.multiply(&self.ctm);
        TextRun {
            text: Some(text),
            y: rendering.f,
            font_size: self.font_size * rendering.vertical_scale(),
            font_name: fonts.get(&self.font).cloned().unwrap_or_else(|| self.font.clone()),
        }
    }
}

/// Walk operators and emit one text run per show-text operator, in stream
/// order.
///
/// `fonts` maps font resource names (`F1`) to base font names
/// (`Helvetica-Bold`); unmapped resources keep their resource name.
pub fn extract_text_runs(operators: &[Operator], fonts: &HashMap<String, String>) -> Vec<TextRun> {
    let mut state = TextState::default();
    let mut runs = Vec::new();

    for op in operators {
        match op {
            Operator::BeginText => {
                state.text_matrix = Matrix::identity();
                state.line_matrix = Matrix::identity();
            },
            Operator::EndText | Operator::Other { .. } => {},
            Operator::Tf { font, size } => {
                state.font = font.clone();
                state.font_size = *size;
            },
            Operator::Td { tx, ty } => state.move_line(*tx, *ty),
            Operator::TD { tx, ty } => {
                state.leading = -*ty;
                state.move_line(*tx, *ty);
            },
            Operator::Tm { matrix } => {
                state.text_matrix = *matrix;
                state.line_matrix = *matrix;
            },
            Operator::TStar => state.move_line(0.0, -state.leading),
            Operator::TL { leading } => state.leading = *leading,
            Operator::Tj { text } => runs.push(state.run(decode_latin1(text), fonts)),
            Operator::TJ { array } => {
                let mut text = String::new();
                for element in array {
                    match element {
                        TextElement::String(bytes) => text.push_str(&decode_latin1(bytes)),
                        TextElement::Offset(offset) if *offset < TJ_SPACE_THRESHOLD => {
                            if !text.is_empty() && !text.ends_with(' ') {
                                text.push(' ');
                            }
                        },
                        TextElement::Offset(_) => {},
                    }
                }
                runs.push(state.run(text, fonts));
            },
            Operator::Quote { text } | Operator::DoubleQuote { text, .. } => {
                state.move_line(0.0, -state.leading);
                runs.push(state.run(decode_latin1(text), fonts));
            },
            Operator::SaveState => state.ctm_stack.push(state.ctm),
            Operator::RestoreState => {
                if let Some(ctm) = state.ctm_stack.pop() {
                    state.ctm = ctm;
                }
            },
            Operator::Cm { matrix } => state.ctm = matrix.multiply(&state.ctm),
        }
    }

    runs
}
