//! PDF object types.

use super::flate;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Dictionary of a PDF object.
pub type Dictionary = HashMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Raw (still encoded) stream data
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real as a float.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Whether a dictionary (or stream dictionary) has `/Type /<name>`.
    pub fn has_type(&self, name: &str) -> bool {
        self.as_dict()
            .and_then(|d| d.get("Type"))
            .and_then(Object::as_name)
            == Some(name)
    }

    /// Decode stream data through the stream's filters.
    ///
    /// Only `/FlateDecode` is supported; any other filter is an error.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        let (dict, data) = match self {
            Object::Stream { dict, data } => (dict, data),
            other => {
                return Err(Error::Decode(format!("expected Stream, found {}", other.type_name())))
            },
        };

        let filters: Vec<&str> = match dict.get("Filter") {
            None => Vec::new(),
            Some(Object::Name(name)) => vec![name.as_str()],
            Some(Object::Array(items)) => items.iter().filter_map(Object::as_name).collect(),
            Some(other) => {
                return Err(Error::Decode(format!("unexpected /Filter {}", other.type_name())))
            },
        };

        let mut decoded = data.to_vec();
        for filter in filters {
            decoded = match filter {
                "FlateDecode" | "Fl" => flate::decode(&decoded)?,
                other => return Err(Error::Decode(format!("unsupported filter /{}", other))),
            };
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn stream(dict: Dictionary, data: &[u8]) -> Object {
        Object::Stream {
            dict,
            data: bytes::Bytes::copy_from_slice(data),
        }
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Object::Integer(3).as_number(), Some(3.0));
        assert_eq!(Object::Real(1.5).as_number(), Some(1.5));
        assert_eq!(Object::Name("Page".into()).as_name(), Some("Page"));
        assert!(Object::Null.is_null());
        assert_eq!(Object::Reference(ObjectRef::new(4, 0)).as_reference(), Some(ObjectRef::new(4, 0)));
        assert_eq!(ObjectRef::new(10, 2).to_string(), "10 2 R");
    }

    #[test]
    fn test_has_type() {
        let mut dict = Dictionary::new();
        dict.insert("Type".into(), Object::Name("Page".into()));
        let obj = Object::Dictionary(dict);
        assert!(obj.has_type("Page"));
        assert!(!obj.has_type("Pages"));
    }

    #[test]
    fn test_decode_unfiltered_stream() {
        let obj = stream(Dictionary::new(), b"BT ET");
        assert_eq!(obj.decode_stream_data().unwrap(), b"BT ET");
    }

    #[test]
    fn test_decode_flate_stream() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"BT (Hi) Tj ET").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut dict = Dictionary::new();
        dict.insert("Filter".into(), Object::Name("FlateDecode".into()));
        let obj = stream(dict, &compressed);
        assert_eq!(obj.decode_stream_data().unwrap(), b"BT (Hi) Tj ET");
    }

    #[test]
    fn test_unsupported_filter() {
        let mut dict = Dictionary::new();
        dict.insert("Filter".into(), Object::Name("DCTDecode".into()));
        assert!(matches!(stream(dict, b"x").decode_stream_data(), Err(Error::Decode(_))));
        assert!(Object::Null.decode_stream_data().is_err());
    }
}
