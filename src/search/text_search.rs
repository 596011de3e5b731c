//! Pattern enumeration over the flattened text view.
//!
//! The pattern is compiled as a regular expression as-is. Special
//! characters are not escaped, so `a.b` matches `axb`.

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One occurrence in the flattened text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// The matched text
    pub text: String,
}

impl Match {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the match is zero-width.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Options for text search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Compare case-sensitively (default is case-insensitive)
    pub match_case: bool,
    /// Only match whole words
    pub whole_words: bool,
}

impl SearchOptions {
    /// Create new default search options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set case sensitivity.
    pub fn with_match_case(mut self, value: bool) -> Self {
        self.match_case = value;
        self
    }

    /// Match whole words only.
    pub fn with_whole_words(mut self, value: bool) -> Self {
        self.whole_words = value;
        self
    }
}

/// Stateless match enumerator.
pub struct TextSearcher;

impl TextSearcher {
    /// Build regex from pattern and options.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPattern`] if the pattern does not compile.
    pub fn build_regex(pattern: &str, options: &SearchOptions) -> Result<Regex> {
        let pattern_str = if options.whole_words {
            format!(r"\b(?:{})\b", pattern)
        } else {
            pattern.to_string()
        };

        RegexBuilder::new(&pattern_str)
            .case_insensitive(!options.match_case)
            .build()
            .map_err(|e| Error::InvalidPattern(e.to_string()))
    }

    /// All non-overlapping occurrences of `pattern` in `text`, in order.
    ///
    /// An empty pattern yields no matches.
    pub fn find_all(text: &str, pattern: &str, options: &SearchOptions) -> Result<Vec<Match>> {
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        let regex = Self::build_regex(pattern, options)?;
        Ok(Self::find_all_with(text, &regex))
    }

    /// All non-overlapping occurrences of a compiled regex in `text`.
    pub fn find_all_with(text: &str, regex: &Regex) -> Vec<Match> {
        regex
            .find_iter(text)
            .map(|m| Match {
                start: m.start(),
                end: m.end(),
                text: m.as_str().to_string(),
            })
            .collect()
    }

    /// Whether `candidate` as a whole equals the pattern under the active
    /// comparison rule.
    pub fn matches_whole(candidate: &str, regex: &Regex) -> bool {
        regex
            .find(candidate)
            .is_some_and(|m| m.start() == 0 && m.end() == candidate.len())
    }
}
