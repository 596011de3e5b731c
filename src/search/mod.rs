//! Text search over the document's flattened text.
//!
//! This module provides regex-based match enumeration and a caller-owned
//! session with a circular cursor. Supports:
//! - Case-insensitive search (the default)
//! - Whole-word matching
//! - Unescaped regular expression patterns
//!
//! ## Example
//!
//! ```
//! use folio_engine::search::{SearchOptions, SearchSession, TextSearcher};
//!
//! let opts = SearchOptions::new().with_whole_words(true);
//! let matches = TextSearcher::find_all("the cat in the category", "cat", &opts).unwrap();
//! assert_eq!(matches.len(), 1);
//!
//! let mut session = SearchSession::new("the", SearchOptions::default());
//! session.refresh("The cat in the hat").unwrap();
//! assert_eq!(session.next().map(|m| m.start), Some(11));
//! assert_eq!(session.next().map(|m| m.start), Some(0));
//! ```

mod session;
mod text_search;

pub use session::SearchSession;
pub use text_search::{Match, SearchOptions, TextSearcher};
