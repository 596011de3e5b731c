//! Find/replace session state.

use super::text_search::{Match, SearchOptions, TextSearcher};
use crate::error::Result;

/// Caller-owned search state: the active pattern, its matches and a
/// circular cursor over them.
///
/// Matches are offsets into one flattened snapshot; call [`refresh`] after
/// the document changes.
///
/// [`refresh`]: SearchSession::refresh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSession {
    pattern: String,
    options: SearchOptions,
    matches: Vec<Match>,
    cursor: Option<usize>,
}

impl SearchSession {
    /// Session for a pattern; no matches until [`refresh`](Self::refresh).
    pub fn new(pattern: impl Into<String>, options: SearchOptions) -> Self {
        Self {
            pattern: pattern.into(),
            options,
            matches: Vec::new(),
            cursor: None,
        }
    }

    /// Active pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Active options.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Matches from the last refresh.
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Cursor index into [`matches`](Self::matches).
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Change pattern and options; clears matches.
    pub fn set_pattern(&mut self, pattern: impl Into<String>, options: SearchOptions) {
        self.pattern = pattern.into();
        self.options = options;
        self.reset();
    }

    /// Re-enumerate against fresh flattened text. The cursor moves to the
    /// first match, or clears if there is none.
    pub fn refresh(&mut self, text: &str) -> Result<usize> {
        self.matches = TextSearcher::find_all(text, &self.pattern, &self.options)?;
        self.cursor = if self.matches.is_empty() { None } else { Some(0) };
        Ok(self.matches.len())
    }

    /// Match under the cursor.
    pub fn current(&self) -> Option<&Match> {
        self.cursor.and_then(|idx| self.matches.get(idx))
    }

    /// Advance the cursor, wrapping from the last match to the first.
    pub fn next(&mut self) -> Option<&Match> {
        if self.matches.is_empty() {
            return None;
        }
        let idx = match self.cursor {
            Some(idx) => (idx + 1) % self.matches.len(),
            None => 0,
        };
        self.cursor = Some(idx);
        self.matches.get(idx)
    }

    /// Move the cursor back, wrapping from the first match to the last.
    pub fn previous(&mut self) -> Option<&Match> {
        if self.matches.is_empty() {
            return None;
        }
        let last = self.matches.len() - 1;
        let idx = match self.cursor {
            Some(0) | None => last,
            Some(idx) => idx - 1,
        };
        self.cursor = Some(idx);
        self.matches.get(idx)
    }

    /// Drop matches and cursor; pattern and options stay.
    pub fn reset(&mut self) {
        self.matches.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(text: &str, pattern: &str) -> SearchSession {
        let mut session = SearchSession::new(pattern, SearchOptions::default());
        session.refresh(text).unwrap();
        session
    }

    #[test]
    fn test_refresh_sets_cursor() {
        let s = session("cat cat cat", "cat");
        assert_eq!(s.matches().len(), 3);
        assert_eq!(s.cursor(), Some(0));
        assert_eq!(s.current().map(|m| m.start), Some(0));
    }

    #[test]
    fn test_next_wraps() {
        let mut s = session("cat cat", "cat");
        assert_eq!(s.next().map(|m| m.start), Some(4));
        assert_eq!(s.next().map(|m| m.start), Some(0));
    }

    #[test]
    fn test_previous_wraps() {
        let mut s = session("cat cat cat", "cat");
        assert_eq!(s.previous().map(|m| m.start), Some(8));
        assert_eq!(s.previous().map(|m| m.start), Some(4));
    }

    #[test]
    fn test_no_matches() {
        let mut s = session("dog", "cat");
        assert!(s.current().is_none());
        assert!(s.next().is_none());
        assert!(s.previous().is_none());
    }

    #[test]
    fn test_reset_keeps_pattern() {
        let mut s = session("cat", "cat");
        s.reset();
        assert!(s.matches().is_empty());
        assert!(s.cursor().is_none());
        assert_eq!(s.pattern(), "cat");
    }

    #[test]
    fn test_set_pattern_clears() {
        let mut s = session("cat", "cat");
        s.set_pattern("dog", SearchOptions::new().with_match_case(true));
        assert!(s.matches().is_empty());
        assert!(s.options().match_case);
    }
}
