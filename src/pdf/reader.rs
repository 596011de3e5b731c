//! Minimal PDF reader.
//!
//! Objects are located by scanning the whole file for `N G obj` headers
//! rather than trusting the cross-reference table, so files with damaged or
//! missing xref data still open. Later definitions of the same object
//! number win, which matches how incremental updates append new versions.
//! Objects packed into object streams (`/Type /ObjStm`) are unpacked after
//! the scan.
//!
//! The reader only goes as far as text extraction needs: the catalog, the
//! page tree, content streams and font base names.

use super::content::{extract_text_runs, parse_content_stream};
use super::lexer::{token, Token};
use super::object::{Dictionary, Object, ObjectRef};
use super::parser::{parse_indirect_object, parse_object};
use crate::error::{Error, Result};
use crate::import::TextRun;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// Regex for finding "N G obj" patterns in PDF files
    static ref RE_OBJ_HEADER: regex::bytes::Regex =
        regex::bytes::Regex::new(r"(\d+)\s+(\d+)\s+obj\b").unwrap();

    /// Regex for the /Root entry of a trailer or xref stream dictionary
    static ref RE_ROOT: regex::bytes::Regex =
        regex::bytes::Regex::new(r"/Root\s+(\d+)\s+(\d+)\s+R").unwrap();

    /// Regex for an /Encrypt entry
    static ref RE_ENCRYPT: regex::bytes::Regex =
        regex::bytes::Regex::new(r"/Encrypt\s+(\d+\s+\d+\s+R|<<)").unwrap();
}

/// Maximum length of a reference chain before giving up.
const MAX_REFERENCE_DEPTH: usize = 32;

/// Deepest /Kids chain walked before the page tree is rejected.
const MAX_PAGE_TREE_DEPTH: usize = 256;

/// How far into the file the `%PDF-` header may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A page with its inherited resources already resolved.
#[derive(Debug, Clone)]
pub struct Page {
    /// Zero-based page index in document order
    pub index: usize,
    dict: Dictionary,
    resources: Dictionary,
}

impl Page {
    /// The page dictionary.
    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// The effective resource dictionary (own or inherited).
    pub fn resources(&self) -> &Dictionary {
        &self.resources
    }
}

/// An opened PDF file.
#[derive(Debug)]
pub struct PdfReader {
    version: String,
    objects: HashMap<u32, Object>,
    root: ObjectRef,
}

impl PdfReader {
    /// Open a PDF from its bytes.
    ///
    /// Fails with `UnsupportedFormat` when there is no `%PDF-` header or
    /// the file is encrypted, and with `ParseError` when no catalog can be
    /// found.
    pub fn open(data: &[u8]) -> Result<Self> {
        let version = parse_header(data)?;
        log::debug!("PDF version {} ({} bytes)", version, data.len());

        if RE_ENCRYPT.is_match(data) {
            return Err(Error::UnsupportedFormat("encrypted PDF".to_string()));
        }

        let mut objects = scan_objects(data);
        unpack_object_streams(&mut objects);

        if objects.is_empty() {
            return Err(Error::ParseError {
                offset: 0,
                reason: "no objects found".to_string(),
            });
        }

        let root = find_root(data, &objects).ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: "document catalog not found".to_string(),
        })?;
        log::debug!("Found {} objects, catalog at {}", objects.len(), root);

        Ok(Self {
            version,
            objects,
            root,
        })
    }

    /// PDF version from the header, e.g. "1.7".
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of objects loaded, including those from object streams.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Look up an indirect object.
    pub fn get_object(&self, obj_ref: ObjectRef) -> Result<&Object> {
        self.objects
            .get(&obj_ref.id)
            .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))
    }

    /// Follow references until a direct object is reached.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> Result<&'a Object> {
        let mut current = obj;
        for _ in 0..MAX_REFERENCE_DEPTH {
            match current {
                Object::Reference(r) => current = self.get_object(*r)?,
                direct => return Ok(direct),
            }
        }
        Err(Error::ParseError {
            offset: 0,
            reason: "reference chain too long".to_string(),
        })
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(obj).ok().and_then(Object::as_dict)
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<&Dictionary> {
        let catalog = self.get_object(self.root)?;
        catalog.as_dict().ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("catalog is a {}", catalog.type_name()),
        })
    }

    /// All pages, in page tree order.
    pub fn pages(&self) -> Result<Vec<Page>> {
        let pages_root = self.catalog()?.get("Pages").ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: "catalog has no /Pages".to_string(),
        })?;

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(pages_root, &Dictionary::new(), 0, &mut visited, &mut pages)?;
        Ok(pages)
    }

    /// Depth-first walk of /Kids. /Resources is inherited from the nearest
    /// ancestor that has one.
    fn collect_pages(
        &self,
        node: &Object,
        inherited: &Dictionary,
        depth: usize,
        visited: &mut HashSet<u32>,
        pages: &mut Vec<Page>,
    ) -> Result<()> {
        if depth > MAX_PAGE_TREE_DEPTH {
            return Err(Error::ParseError {
                offset: 0,
                reason: format!("page tree deeper than {} levels", MAX_PAGE_TREE_DEPTH),
            });
        }
        if let Some(r) = node.as_reference() {
            if !visited.insert(r.id) {
                log::warn!("Page tree cycle at {}, skipping", r);
                return Ok(());
            }
        }

        let dict = match self.resolve_dict(node) {
            Some(dict) => dict,
            None => {
                log::warn!("Page tree node is not a dictionary, skipping");
                return Ok(());
            },
        };

        let resources = dict
            .get("Resources")
            .and_then(|r| self.resolve_dict(r))
            .unwrap_or(inherited);

        match dict.get("Kids") {
            Some(kids) => {
                let kids = self.resolve(kids)?.as_array().cloned().unwrap_or_default();
                for kid in &kids {
                    self.collect_pages(kid, resources, depth + 1, visited, pages)?;
                }
            },
            None => pages.push(Page {
                index: pages.len(),
                dict: dict.clone(),
                resources: resources.clone(),
            }),
        }
        Ok(())
    }

    /// Number of pages.
    pub fn page_count(&self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    /// Decoded content of a page. An array of content streams is joined
    /// with newlines; a stream that fails to decode is skipped with a
    /// warning.
    pub fn page_content(&self, page: &Page) -> Result<Vec<u8>> {
        let contents = match page.dict.get("Contents") {
            Some(contents) => self.resolve(contents)?,
            None => return Ok(Vec::new()),
        };

        let streams: Vec<&Object> = match contents {
            Object::Array(items) => items.iter().filter_map(|item| self.resolve(item).ok()).collect(),
            other => vec![other],
        };

        let mut data = Vec::new();
        for stream in streams {
            match stream.decode_stream_data() {
                Ok(decoded) => {
                    if !data.is_empty() {
                        data.push(b'\n');
                    }
                    data.extend_from_slice(&decoded);
                },
                Err(e) => log::warn!("Page {}: skipping content stream: {}", page.index + 1, e),
            }
        }
        Ok(data)
    }

    /// Font resource name → /BaseFont for a page.
    pub fn page_fonts(&self, page: &Page) -> HashMap<String, String> {
        let fonts = match page.resources.get("Font").and_then(|f| self.resolve_dict(f)) {
            Some(fonts) => fonts,
            None => return HashMap::new(),
        };

        fonts
            .iter()
            .filter_map(|(name, font)| {
                let base = self.resolve_dict(font)?.get("BaseFont")?.as_name()?;
                // Subset fonts carry a "ABCDEF+" prefix
                let base = match base.split_once('+') {
                    Some((tag, rest)) if tag.len() == 6 => rest,
                    _ => base,
                };
                Some((name.clone(), base.to_string()))
            })
            .collect()
    }

    /// Text runs of one page, in content stream order.
    pub fn page_runs(&self, page: &Page) -> Result<Vec<TextRun>> {
        let content = self.page_content(page)?;
        let operators = parse_content_stream(&content);
        Ok(extract_text_runs(&operators, &self.page_fonts(page)))
    }

    /// Text runs for every page.
    pub fn all_page_runs(&self) -> Result<Vec<Vec<TextRun>>> {
        self.pages()?.iter().map(|page| self.page_runs(page)).collect()
    }
}

/// Offset of the `%PDF-` header, if it appears near the start of the file.
pub fn header_offset(data: &[u8]) -> Option<usize> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).position(|w| w == b"%PDF-")
}

fn parse_header(data: &[u8]) -> Result<String> {
    let start = header_offset(data)
        .ok_or_else(|| Error::UnsupportedFormat("missing %PDF- header".to_string()))?;

    let version: String = data[start + 5..]
        .iter()
        .take_while(|c| c.is_ascii_digit() || **c == b'.')
        .map(|&c| c as char)
        .collect();
    Ok(version)
}

fn parse_number<T: std::str::FromStr>(bytes: &[u8]) -> Option<T> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Parse every `N G obj` header found in the file.
///
/// Matches inside an object that was already parsed (stream data, for
/// instance) are ignored.
fn scan_objects(data: &[u8]) -> HashMap<u32, Object> {
    let mut objects = HashMap::new();
    let mut parsed_until = 0;

    for m in RE_OBJ_HEADER.find_iter(data) {
        let offset = m.start();
        if offset < parsed_until {
            continue;
        }
        match parse_indirect_object(&data[offset..], offset) {
            Ok((obj_ref, object, consumed)) => {
                parsed_until = offset + consumed;
                if objects.insert(obj_ref.id, object).is_some() {
                    log::debug!("Object {} redefined at offset {}", obj_ref.id, offset);
                }
            },
            Err(e) => log::warn!(
                "{}",
                Error::ParseWarning {
                    offset,
                    message: format!("skipping object: {}", e),
                }
            ),
        }
    }

    objects
}

/// Unpack compressed objects. Objects defined directly in the file take
/// precedence over copies in object streams.
fn unpack_object_streams(objects: &mut HashMap<u32, Object>) {
    let streams: Vec<(u32, Object)> = objects
        .iter()
        .filter(|(_, obj)| obj.has_type("ObjStm"))
        .map(|(id, obj)| (*id, obj.clone()))
        .collect();

    for (stream_id, stream) in streams {
        match parse_object_stream(&stream) {
            Ok(contained) => {
                log::debug!("Object stream {} holds {} objects", stream_id, contained.len());
                for (id, obj) in contained {
                    objects.entry(id).or_insert(obj);
                }
            },
            Err(e) => log::warn!("Skipping object stream {}: {}", stream_id, e),
        }
    }
}

/// Parse an object stream into (object number, object) pairs.
///
/// The decoded data starts with /N pairs of integers (object number and
/// offset relative to /First) followed by the objects themselves.
pub fn parse_object_stream(stream: &Object) -> Result<Vec<(u32, Object)>> {
    let dict = stream
        .as_dict()
        .ok_or_else(|| Error::Decode("object stream is not a stream".to_string()))?;
    let count = dict
        .get("N")
        .and_then(Object::as_integer)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::Decode("object stream missing /N".to_string()))?;
    let first = dict
        .get("First")
        .and_then(Object::as_integer)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::Decode("object stream missing /First".to_string()))?;

    let data = stream.decode_stream_data()?;
    if first > data.len() {
        return Err(Error::Decode(format!(
            "object stream /First {} beyond data length {}",
            first,
            data.len()
        )));
    }

    let mut header = &data[..first];
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let (rest, id) = match token(header) {
            Ok((rest, Token::Integer(id))) => (rest, id),
            _ => break,
        };
        let (rest, offset) = match token(rest) {
            Ok((rest, Token::Integer(offset))) => (rest, offset),
            _ => break,
        };
        header = rest;
        if let (Ok(id), Ok(offset)) = (u32::try_from(id), usize::try_from(offset)) {
            entries.push((id, offset));
        }
    }
    if entries.len() < count {
        log::warn!("Object stream header lists {} of {} objects", entries.len(), count);
    }

    let mut objects = Vec::with_capacity(entries.len());
    for (id, offset) in entries {
        let start = first + offset;
        if start >= data.len() {
            log::warn!("Object {} offset {} is beyond object stream data", id, offset);
            continue;
        }
        match parse_object(&data[start..]) {
            Ok((_, obj)) => objects.push((id, obj)),
            Err(e) => log::warn!("Failed to parse object {} in object stream: {:?}", id, e),
        }
    }
    Ok(objects)
}

/// The catalog reference: the last /Root entry that points at a loaded
/// object, or else the lowest-numbered `/Type /Catalog` object.
fn find_root(data: &[u8], objects: &HashMap<u32, Object>) -> Option<ObjectRef> {
    let from_trailer = RE_ROOT
        .captures_iter(data)
        .filter_map(|caps| {
            let id = parse_number::<u32>(caps.get(1)?.as_bytes())?;
            let gen = parse_number::<u16>(caps.get(2)?.as_bytes())?;
            Some(ObjectRef::new(id, gen))
        })
        .filter(|r| objects.get(&r.id).is_some_and(|obj| obj.as_dict().is_some()))
        .last();

    if from_trailer.is_some() {
        return from_trailer;
    }

    log::warn!("No usable /Root entry, searching for /Type /Catalog");
    objects
        .iter()
        .filter(|(_, obj)| obj.has_type("Catalog"))
        .map(|(id, _)| *id)
        .min()
        .map(|id| ObjectRef::new(id, 0))
}
