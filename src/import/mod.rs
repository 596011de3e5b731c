//! PDF import.
//!
//! Import runs in three stages, each of which can reject the input:
//!
//! 1. Size gate: inputs above `max_import_bytes` fail with `FileTooLarge`
//!    before any byte is inspected.
//! 2. Format gate: inputs without a `%PDF-` header fail with
//!    `UnsupportedFormat`.
//! 3. Reading and inference: any failure while reading the file becomes a
//!    single `ImportFailed`. No partial document is returned.
//!
//! # Example
//!
//! ```
//! use folio_engine::config::EngineConfig;
//! use folio_engine::error::Error;
//! use folio_engine::import::import_pdf;
//!
//! let config = EngineConfig::default().with_max_import_bytes(4);
//! let err = import_pdf(b"%PDF-1.7", &config).unwrap_err();
//! assert!(matches!(err, Error::FileTooLarge { size: 8, limit: 4 }));
//! ```

mod inference;

pub use inference::{infer_structure, InferredBlock, InferredDocument, TextRun};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::pdf::reader::{header_offset, PdfReader};
use std::path::Path;

fn check_size(size: usize, config: &EngineConfig) -> Result<()> {
    if size > config.max_import_bytes {
        return Err(Error::FileTooLarge {
            size,
            limit: config.max_import_bytes,
        });
    }
    Ok(())
}

/// Import PDF bytes into an inferred document.
pub fn import_pdf(bytes: &[u8], config: &EngineConfig) -> Result<InferredDocument> {
    check_size(bytes.len(), config)?;

    if header_offset(bytes).is_none() {
        return Err(Error::UnsupportedFormat("missing %PDF- header".to_string()));
    }

    let pages = read_pages(bytes).map_err(|e| {
        log::warn!("PDF import failed: {}", e);
        Error::ImportFailed(e.to_string())
    })?;

    let document = infer_structure(&pages, config);
    log::info!(
        "Imported {} pages into {} blocks",
        document.page_count,
        document.blocks.len()
    );
    Ok(document)
}

fn read_pages(bytes: &[u8]) -> Result<Vec<Vec<TextRun>>> {
    let reader = PdfReader::open(bytes)?;
    let pages = reader.all_page_runs()?;
    if pages.is_empty() {
        return Err(Error::ParseError {
            offset: 0,
            reason: "document has no pages".to_string(),
        });
    }
    Ok(pages)
}

/// Import PDF bytes straight to markup.
pub fn import_pdf_to_markup(bytes: &[u8], config: &EngineConfig) -> Result<String> {
    Ok(import_pdf(bytes, config)?.to_markup())
}

/// Import a PDF file.
///
/// The size gate uses the file's metadata, so oversized files are never
/// read into memory.
pub fn import_pdf_file(path: impl AsRef<Path>, config: &EngineConfig) -> Result<InferredDocument> {
    let path = path.as_ref();
    let size = std::fs::metadata(path)
        .map_err(|e| Error::ImportFailed(format!("{}: {}", path.display(), e)))?
        .len();
    check_size(usize::try_from(size).unwrap_or(usize::MAX), config)?;

    let bytes =
        std::fs::read(path).map_err(|e| Error::ImportFailed(format!("{}: {}", path.display(), e)))?;
    import_pdf(&bytes, config)
}
