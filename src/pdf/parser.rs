//! PDF object parser.
//!
//! Builds [`Object`]s from lexer tokens: primitives, arrays, dictionaries,
//! streams and indirect references (`10 0 R`).

use super::lexer::{token, Token};
use super::object::{Dictionary, Object, ObjectRef};
use crate::error::{Error, Result};
use nom::IResult;

/// Deepest array/dictionary nesting accepted before parsing fails.
pub const MAX_NESTING_DEPTH: usize = 256;

fn nom_error(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Decode escape sequences in a literal string.
///
/// Handles `\n \r \t \b \f \( \) \\`, octal `\ddd` and line continuations.
/// An unknown escape drops the backslash.
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            result.push(raw[i]);
            i += 1;
            continue;
        }
        match raw[i + 1] {
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'b' => result.push(8),
            b'f' => result.push(12),
            b'\n' => {},
            b'\r' => {
                if raw.get(i + 2) == Some(&b'\n') {
                    i += 1;
                }
            },
            c @ b'0'..=b'7' => {
                let mut value = u32::from(c - b'0');
                let mut len = 1;
                while len < 3 {
                    match raw.get(i + 1 + len) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            len += 1;
                        },
                        _ => break,
                    }
                }
                result.push((value & 0xFF) as u8);
                i += 1 + len;
                continue;
            },
            other => result.push(other),
        }
        i += 2;
    }

    result
}

/// Decode a hexadecimal string. Whitespace is ignored; an odd final digit
/// is padded with 0.
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes
        .iter()
        .filter(|c| !c.is_ascii_whitespace())
        .copied()
        .collect();

    digits
        .chunks(2)
        .map(|chunk| {
            let hi = hex_value(chunk[0])?;
            let lo = match chunk.get(1) {
                Some(&c) => hex_value(c)?,
                None => 0,
            };
            Ok(hi << 4 | lo)
        })
        .collect()
}

fn hex_value(c: u8) -> Result<u8> {
    (c as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("invalid hex digit {:?}", c as char),
        })
}

/// Parse a PDF object from input bytes.
///
/// ```
/// use folio_engine::pdf::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /Type /Page /Kids [1 0 R] >>").unwrap();
/// assert!(obj.has_type("Page"));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_nested(input, 0)
}

/// Whether a parse error came from exceeding [`MAX_NESTING_DEPTH`].
pub fn is_nesting_error(err: &nom::Err<nom::error::Error<&[u8]>>) -> bool {
    matches!(err, nom::Err::Failure(e) if e.code == nom::error::ErrorKind::TooLarge)
}

fn parse_nested(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    let (rest, tok) = token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),

        Token::Integer(i) => {
            // Either a plain integer or the start of "id gen R"
            if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if let (Ok(id), Ok(gen)) = (u32::try_from(i), u16::try_from(gen)) {
                        return Ok((after_r, Object::Reference(ObjectRef::new(id, gen))));
                    }
                }
            }
            Ok((rest, Object::Integer(i)))
        },

        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::LiteralString(bytes) => Ok((rest, Object::String(decode_literal_string_escapes(bytes)))),
        Token::HexString(hex) => match decode_hex(hex) {
            Ok(decoded) => Ok((rest, Object::String(decoded))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::HexDigit,
            ))),
        },
        Token::Name(name) => Ok((rest, Object::Name(name))),
        Token::ArrayStart | Token::DictStart if depth >= MAX_NESTING_DEPTH => Err(nom::Err::Failure(
            nom::error::Error::new(input, nom::error::ErrorKind::TooLarge),
        )),
        Token::ArrayStart => parse_array(rest, depth + 1),

        Token::DictStart => {
            let (rest, dict) = parse_dictionary(rest, depth + 1)?;
            match token(rest) {
                Ok((stream_input, Token::Keyword(b"stream"))) => {
                    let (rest, data) = parse_stream_data(stream_input, &dict)?;
                    Ok((
                        rest,
                        Object::Stream {
                            dict,
                            data: bytes::Bytes::from(data),
                        },
                    ))
                },
                _ => Ok((rest, Object::Dictionary(dict))),
            }
        },

        _ => Err(nom_error(input, nom::error::ErrorKind::Tag)),
    }
}

/// Parse stream data after the `stream` keyword.
///
/// A direct integer `/Length` is trusted; otherwise the data runs up to
/// the next `endstream`.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        input
    };

    if let Some(length) = dict.get("Length").and_then(Object::as_integer) {
        let length = usize::try_from(length).unwrap_or(usize::MAX);
        if length <= input.len() {
            let after = &input[length..];
            if let Ok((rest, Token::Keyword(b"endstream"))) = token(after) {
                return Ok((rest, input[..length].to_vec()));
            }
            log::warn!("Stream /Length {} does not end at endstream; scanning", length);
        }
    }

    match find_endstream(input) {
        Some(pos) => {
            let mut data = &input[..pos];
            // EOL before endstream is not part of the data
            if let Some(stripped) = data.strip_suffix(b"\r\n") {
                data = stripped;
            } else if let Some(stripped) = data.strip_suffix(b"\n") {
                data = stripped;
            } else if let Some(stripped) = data.strip_suffix(b"\r") {
                data = stripped;
            }
            Ok((&input[pos + b"endstream".len()..], data.to_vec()))
        },
        None => Err(nom_error(input, nom::error::ErrorKind::Eof)),
    }
}

fn find_endstream(input: &[u8]) -> Option<usize> {
    let keyword = b"endstream";
    input
        .windows(keyword.len())
        .position(|window| window == keyword)
}

/// Parse a PDF array after its `[`.
fn parse_array(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    let mut objects = Vec::new();
    let mut remaining = input;

    loop {
        if let Ok((rest, Token::ArrayEnd)) = token(remaining) {
            return Ok((rest, Object::Array(objects)));
        }
        let (rest, obj) = parse_nested(remaining, depth)?;
        objects.push(obj);
        remaining = rest;
    }
}

/// Parse a PDF dictionary after its `<<`.
fn parse_dictionary(input: &[u8], depth: usize) -> IResult<&[u8], Dictionary> {
    let mut dict = Dictionary::new();
    let mut remaining = input;

    loop {
        let (rest, tok) = token(remaining)?;
        match tok {
            Token::DictEnd => return Ok((rest, dict)),
            Token::Name(key) => {
                let (rest, value) = parse_nested(rest, depth)?;
                dict.insert(key, value);
                remaining = rest;
            },
            _ => return Err(nom_error(remaining, nom::error::ErrorKind::Tag)),
        }
    }
}

/// Parse `N G obj <object> endobj` at the start of `input`.
///
/// Returns the reference, the object and the number of bytes consumed.
/// `offset` is only used for error reporting.
pub fn parse_indirect_object(input: &[u8], offset: usize) -> Result<(ObjectRef, Object, usize)> {
    let parse_error = |reason: &str| Error::ParseError {
        offset,
        reason: reason.to_string(),
    };

    let (rest, id) = match token(input) {
        Ok((rest, Token::Integer(id))) => (rest, id),
        _ => return Err(parse_error("expected object number")),
    };
    let (rest, gen) = match token(rest) {
        Ok((rest, Token::Integer(gen))) => (rest, gen),
        _ => return Err(parse_error("expected generation number")),
    };
    let rest = match token(rest) {
        Ok((rest, Token::Keyword(b"obj"))) => rest,
        _ => return Err(parse_error("expected obj keyword")),
    };
    let (rest, object) =
        parse_object(rest).map_err(|e| parse_error(&format!("invalid object body: {:?}", e)))?;

    let rest = match token(rest) {
        Ok((after, Token::Keyword(b"endobj"))) => after,
        _ => {
            log::warn!(
                "{}",
                Error::ParseWarning {
                    offset,
                    message: format!("object {} {} is missing endobj", id, gen),
                }
            );
            rest
        },
    };

    let id = u32::try_from(id).map_err(|_| parse_error("object number out of range"))?;
    let gen = u16::try_from(gen).map_err(|_| parse_error("generation number out of range"))?;
    Ok((ObjectRef::new(id, gen), object, input.len() - rest.len()))
}
