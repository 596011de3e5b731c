//! PDF reading, as far as text import needs it.
//!
//! - [`lexer`] and [`parser`] turn bytes into [`Object`]s with nom
//! - [`reader`] locates objects and walks the page tree
//! - [`content`] interprets text operators into positioned text runs
//!
//! ```
//! use folio_engine::pdf::PdfReader;
//!
//! let err = PdfReader::open(b"not a pdf").unwrap_err();
//! assert!(err.to_string().contains("Unsupported format"));
//! ```

pub mod content;
pub mod flate;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod reader;

pub use object::{Dictionary, Object, ObjectRef};
pub use reader::{Page, PdfReader};
