// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::should_implement_trait)]
#![allow(clippy::wrong_self_convention)]

//! # Folio Engine
//!
//! Text-transformation engine for a rich-text editor: search and replace
//! over a structured document, footnote numbering that survives arbitrary
//! edits, and PDF import with heading and paragraph inference.
//!
//! ## Core Features
//!
//! - **Position Mapping**: flattened-text offsets ↔ structural positions
//! - **Find**: regex matching with case and whole-word options, circular
//!   cursor
//! - **Replace**: preserve-style (markup substitution) and reapply-style
//!   (captured marks applied to every replacement) in one atomic
//!   transaction
//! - **Footnotes**: markers renumbered 1..N, notes paired, orphans removed
//! - **PDF Import**: size and format gates, a small nom-based PDF reader,
//!   and font-size driven structure inference
//!
//! ## Architecture
//!
//! The engine talks to the document through the [`DocumentTree`] trait.
//! [`Document`] is the in-memory implementation and [`Editor`] ties a
//! document to the search session and the post-mutation hooks.
//!
//! ## Quick Start
//!
//! ```
//! use folio_engine::{Editor, ReplaceMode, ReplaceRequest, SearchOptions};
//! use folio_engine::document::{DocumentTree, Selection};
//!
//! # fn main() -> folio_engine::Result<()> {
//! let mut editor = Editor::from_markup("<p>The <b>cat</b> sat, the cat ran</p>")?;
//!
//! // Select the bold "cat" so its style is captured
//! assert_eq!(editor.find("cat", SearchOptions::default())?, 2);
//! editor.set_selection(Selection::new(5, 8))?;
//!
//! let request = ReplaceRequest::new("cat", "dog").with_mode(ReplaceMode::ReapplyStyle);
//! editor.replace(&request)?;
//! assert_eq!(editor.to_markup(), "<p>The <b>dog</b> sat, the <b>dog</b> ran</p>");
//! assert_eq!(editor.document().selection(), Selection::collapsed(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Document model
pub mod document;
pub mod mapper;

// Find and replace
pub mod replace;
pub mod search;

// Footnote numbering
pub mod footnotes;

// PDF reading and import
pub mod import;
pub mod pdf;

// Editing session
pub mod editor;

// Re-exports
pub use config::EngineConfig;
pub use document::{Document, DocumentTree};
pub use editor::{Editor, PostEffect};
pub use error::{Error, Result};
pub use footnotes::{FootnoteMaintainer, MaintenanceReport};
pub use mapper::PositionMapper;
pub use replace::{ReplaceMode, ReplaceOutcome, ReplaceRequest};
pub use search::{Match, SearchOptions, SearchSession};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the library
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "folio_engine");
    }
}
