//! Word index: the ordered spans the highlight cursor steps through.

use regex::Regex;
use std::sync::LazyLock;

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

/// One maximal run of non-whitespace, as character offsets `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    pub start: usize,
    pub end: usize,
}

impl WordSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Immutable, ordered word spans of one displayed text.
///
/// New text means a new index; there is no incremental update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordIndex {
    spans: Vec<WordSpan>,
}

impl WordIndex {
    pub fn build(text: &str) -> Self {
        let mut spans = Vec::new();
        // Regex offsets are bytes; the text surface addresses characters.
        let mut byte_pos = 0;
        let mut char_pos = 0;

        for m in WORD_PATTERN.find_iter(text) {
            char_pos += text[byte_pos..m.start()].chars().count();
            let start = char_pos;
            char_pos += m.as_str().chars().count();
            byte_pos = m.end();
            spans.push(WordSpan::new(start, char_pos));
        }

        Self { spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<WordSpan> {
        self.spans.get(index).copied()
    }

    pub fn spans(&self) -> &[WordSpan] {
        &self.spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_words() {
        assert!(WordIndex::build("").is_empty());
        assert!(WordIndex::build("  \n\t ").is_empty());
    }

    #[test]
    fn spans_skip_whitespace_runs() {
        let index = WordIndex::build("a  bb   ccc");
        assert_eq!(
            index.spans(),
            &[WordSpan::new(0, 1), WordSpan::new(3, 5), WordSpan::new(8, 11)]
        );
    }

    #[test]
    fn punctuation_stays_attached() {
        let index = WordIndex::build("Hello, world!\nNext");
        assert_eq!(
            index.spans(),
            &[WordSpan::new(0, 6), WordSpan::new(7, 13), WordSpan::new(14, 18)]
        );
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let index = WordIndex::build("héllo wörld ✓");
        assert_eq!(
            index.spans(),
            &[WordSpan::new(0, 5), WordSpan::new(6, 11), WordSpan::new(12, 13)]
        );
    }

    #[test]
    fn rebuild_reflects_only_new_text() {
        let first = WordIndex::build("one two three four");
        let second = WordIndex::build("five");
        assert_eq!(first.len(), 4);
        assert_eq!(second.spans(), &[WordSpan::new(0, 4)]);
        assert_eq!(second.get(1), None);
    }
}
