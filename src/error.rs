//! Error types for the editing engine.
//!
//! One error enum covers the whole crate: position mapping, search, markup
//! handling, transactions and the PDF import boundary. A replace pass that
//! finds nothing is not an error; see [`crate::replace::ReplaceOutcome`].

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Offset or structural position outside the current document.
    ///
    /// This is a programmer error inside the engine and must never be shown
    /// to the user.
    #[error("Position {value} out of range (limit {limit})")]
    OutOfRange {
        /// Requested offset or position
        value: usize,
        /// Largest valid value
        limit: usize,
    },

    /// Search pattern could not be compiled
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    /// Markup string could not be loaded into a document
    #[error("Invalid markup: {0}")]
    InvalidMarkup(String),

    /// A transaction step could not be applied to the document
    #[error("Invalid transaction step: {0}")]
    InvalidTransaction(String),

    /// Import input exceeds the configured size ceiling
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge {
        /// Size of the rejected input
        size: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Import input is not a format the importer understands
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Import input could not be read
    #[error("Import failed: {0}")]
    ImportFailed(String),

    /// Parse warning (non-fatal, logged only)
    #[error("Parse warning at byte {offset}: {message}")]
    ParseWarning {
        /// Byte offset where warning occurred
        offset: usize,
        /// Warning message
        message: String,
    },

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Referenced PDF object not found
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read
    #[error("Configuration error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error belongs to the import boundary and should be shown
    /// to the user as a status message.
    pub fn is_import_error(&self) -> bool {
        matches!(
            self,
            Error::FileTooLarge { .. } | Error::UnsupportedFormat(_) | Error::ImportFailed(_)
        )
    }

    /// Status text for the import boundary.
    ///
    /// Non-import errors get a generic message; their details go to the log.
    pub fn user_message(&self) -> String {
        match self {
            Error::FileTooLarge { limit, .. } => format!(
                "This file is too large to import. Please choose a file smaller than {} MB.",
                limit / (1024 * 1024)
            ),
            Error::UnsupportedFormat(_) => {
                "This file type is not supported. Please choose a PDF document.".to_string()
            },
            Error::ImportFailed(_) => {
                "The file could not be read. It may be damaged or password protected.".to_string()
            },
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}
