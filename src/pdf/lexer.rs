//! PDF lexer (tokenizer).
//!
//! Tokenizes both file-level syntax (objects, dictionaries, streams) and
//! content streams. Content-stream operators such as `BT`, `Tj` or `'` come
//! out as [`Token::Keyword`], as do `obj`, `endobj`, `stream` and
//! `endstream`.
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, value},
    sequence::{delimited, preceded},
    IResult,
};

/// Token types recognized by the lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),

    /// Real number (e.g., 3.14, -2.5, .5)
    Real(f64),

    /// Literal string bytes, escapes not yet decoded
    LiteralString(&'a [u8]),

    /// Hexadecimal string digits, whitespace preserved
    HexString(&'a [u8]),

    /// Name with `#XX` escapes decoded
    Name(String),

    /// Boolean true keyword
    True,

    /// Boolean false keyword
    False,

    /// Null keyword
    Null,

    /// Array start delimiter [
    ArrayStart,

    /// Array end delimiter ]
    ArrayEnd,

    /// Dictionary start delimiter <<
    DictStart,

    /// Dictionary end delimiter >>
    DictEnd,

    /// Reference keyword "R"
    R,

    /// Any other bare word: obj/endobj/stream/endstream or an operator
    Keyword(&'a [u8]),
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn whitespace(input: &[u8]) -> IResult<&[u8], ()> {
    value((), take_while1(is_whitespace))(input)
}

fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip all whitespace and comments.
pub fn skip_ws(input: &[u8]) -> &[u8] {
    let mut remaining = input;
    loop {
        if let Ok((rest, _)) = whitespace(remaining) {
            remaining = rest;
            continue;
        }
        if let Ok((rest, _)) = comment(remaining) {
            remaining = rest;
            continue;
        }
        return remaining;
    }
}

fn number_error(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
}

/// Parse an integer or real number.
///
/// Leading `+`/`-` and numbers starting or ending with `.` are allowed.
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let start = input;
    let (input, _sign) = opt(one_of("+-"))(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac_part) = opt(preceded(char('.'), opt(digit1)))(input)?;

    if int_part.is_none() && !matches!(frac_part, Some(Some(_))) {
        return Err(number_error(start));
    }
    // "12abc" is a bare word, not a number
    if input.first().is_some_and(|&c| is_regular(c)) {
        return Err(number_error(start));
    }

    let digits = &start[..start.len() - input.len()];
    let text = std::str::from_utf8(digits).map_err(|_| number_error(start))?;

    if frac_part.is_some() {
        let trimmed = text.strip_prefix('+').unwrap_or(text);
        let normalized = match trimmed.strip_suffix('.') {
            Some(head) => format!("{}.0", head),
            None => trimmed.to_string(),
        };
        let normalized = normalized.replacen("-.", "-0.", 1);
        let normalized = if normalized.starts_with('.') {
            format!("0{}", normalized)
        } else {
            normalized
        };
        let num: f64 = normalized.parse().map_err(|_| number_error(start))?;
        Ok((input, Token::Real(num)))
    } else {
        let num: i64 = text
            .strip_prefix('+')
            .unwrap_or(text)
            .parse()
            .map_err(|_| number_error(start))?;
        Ok((input, Token::Integer(num)))
    }
}

/// Parse a literal string enclosed in parentheses.
///
/// Balanced nested parentheses and escapes are skipped over; the raw bytes
/// are returned and decoded by the parser.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (remaining, _) = char('(')(input)?;
    let mut depth = 1;
    let mut pos = 0;

    while depth > 0 && pos < remaining.len() {
        match remaining[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    if depth != 0 || pos > remaining.len() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    Ok((&remaining[pos..], Token::LiteralString(&remaining[..pos - 1])))
}

/// Parse a hexadecimal string enclosed in angle brackets.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    delimited(
        char('<'),
        map(
            take_while(|c: u8| c.is_ascii_hexdigit() || c.is_ascii_whitespace()),
            Token::HexString,
        ),
        char('>'),
    )(input)
}

/// Decode `#XX` escape sequences in names.
///
/// ```
/// # use folio_engine::pdf::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes("A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes("A#"), "A#");
/// ```
pub fn decode_name_escapes(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '#' {
            result.push(ch);
            continue;
        }
        match (chars.next(), chars.next()) {
            (Some(h1), Some(h2)) => match u8::from_str_radix(&format!("{}{}", h1, h2), 16) {
                Ok(byte) => result.push(byte as char),
                Err(_) => {
                    result.push('#');
                    result.push(h1);
                    result.push(h2);
                },
            },
            (Some(h1), None) => {
                result.push('#');
                result.push(h1);
            },
            _ => result.push('#'),
        }
    }

    result
}

/// Parse a name starting with /.
fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(take_while(is_regular), |bytes: &[u8]| {
            Token::Name(decode_name_escapes(&String::from_utf8_lossy(bytes)))
        }),
    )(input)
}

/// Parse delimiters and bare words.
fn parse_keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
        map(take_while1(is_regular), |word: &[u8]| match word {
            b"true" => Token::True,
            b"false" => Token::False,
            b"null" => Token::Null,
            b"R" => Token::R,
            other => Token::Keyword(other),
        }),
    ))(input)
}

/// Parse a single token after skipping whitespace and comments.
///
/// Numbers are tried before bare words so that `-.5` is a number while
/// `T*` and `'` are keywords.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    alt((
        parse_name,
        parse_number,
        parse_literal_string,
        parse_hex_string,
        parse_keyword,
    ))(input)
}
