use crate::error::{ParserError, Result};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Pattern used by [`RegexLineParser::default`].
pub const DEFAULT_WORD_PATTERN: &str = r"\w+";

/// Splits one line of text into words.
pub trait LineParser: Send + Sync {
    fn extract_words<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a>;
}

impl<P: LineParser + ?Sized> LineParser for Arc<P> {
    fn extract_words<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        (**self).extract_words(line)
    }
}

impl<P: LineParser + ?Sized> LineParser for Box<P> {
    fn extract_words<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        (**self).extract_words(line)
    }
}

/// Words are maximal runs of characters accepted by a predicate.
#[derive(Clone, Copy)]
pub struct WordCharacterParser {
    name: &'static str,
    is_word_char: fn(char) -> bool,
}

impl WordCharacterParser {
    pub const fn new(name: &'static str, is_word_char: fn(char) -> bool) -> Self {
        Self { name, is_word_char }
    }

    /// Letters and digits form words; everything else separates them.
    #[must_use]
    pub fn alphanumeric() -> Self {
        Self::new("alphanumeric", char::is_alphanumeric)
    }

    /// Only punctuation and whitespace separate words.
    #[must_use]
    pub fn punctuation_splitting() -> Self {
        Self::new("punctuation_splitting", is_not_punctuation_or_whitespace)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for WordCharacterParser {
    fn default() -> Self {
        Self::alphanumeric()
    }
}

impl fmt::Debug for WordCharacterParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WordCharacterParser").field(&self.name).finish()
    }
}

impl LineParser for WordCharacterParser {
    fn extract_words<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        let is_word_char = self.is_word_char;
        Box::new(
            line.split(move |c: char| !is_word_char(c))
                .filter(|word| !word.is_empty()),
        )
    }
}

fn is_not_punctuation_or_whitespace(c: char) -> bool {
    !(is_punctuation(c) || c.is_whitespace())
}

/// ASCII punctuation plus the general punctuation blocks.
fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '\u{00A1}'
                | '\u{00A7}'
                | '\u{00AB}'
                | '\u{00B6}'
                | '\u{00B7}'
                | '\u{00BB}'
                | '\u{00BF}'
                | '\u{2010}'..='\u{2027}'
                | '\u{2030}'..='\u{205E}'
                | '\u{2E00}'..='\u{2E4F}'
                | '\u{3001}'..='\u{3003}'
                | '\u{3008}'..='\u{3011}'
        )
}

/// Every non-overlapping regex match is a word.
#[derive(Debug, Clone)]
pub struct RegexLineParser {
    pattern: Regex,
}

impl RegexLineParser {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| ParserError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::from_regex(regex))
    }

    pub const fn from_regex(pattern: Regex) -> Self {
        Self { pattern }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for RegexLineParser {
    fn default() -> Self {
        Self::new(DEFAULT_WORD_PATTERN).expect("default word pattern compiles")
    }
}

impl LineParser for RegexLineParser {
    fn extract_words<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(
            self.pattern
                .find_iter(line)
                .map(|found| found.as_str())
                .filter(|word| !word.is_empty()),
        )
    }
}

/// Words at Unicode word boundaries, keeping only segments with an alphanumeric character.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWordsLineParser;

impl LineParser for UnicodeWordsLineParser {
    fn extract_words<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(line.unicode_words())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words<'a>(parser: &'a dyn LineParser, line: &'a str) -> Vec<&'a str> {
        parser.extract_words(line).collect()
    }

    #[test]
    fn alphanumeric_splits_on_everything_else() {
        let parser = WordCharacterParser::alphanumeric();
        assert_eq!(
            words(&parser, "  foo_bar, baz42!é-çà "),
            vec!["foo", "bar", "baz42", "é", "çà"]
        );
        assert!(words(&parser, "").is_empty());
        assert!(words(&parser, "--- ...").is_empty());
    }

    #[test]
    fn punctuation_splitting_splits_on_punctuation_and_whitespace() {
        let parser = WordCharacterParser::punctuation_splitting();
        assert_eq!(
            words(&parser, "a+b=c, «quoted»\tlast…"),
            vec!["a", "b", "c", "quoted", "last"]
        );
        assert_eq!(words(&parser, "naïve£5 x"), vec!["naïve£5", "x"]);
        assert_eq!(parser.name(), "punctuation_splitting");
    }

    #[test]
    fn regex_parser_returns_matches() {
        let parser = RegexLineParser::default();
        assert_eq!(parser.pattern(), DEFAULT_WORD_PATTERN);
        assert_eq!(words(&parser, "snake_case and-dash"), vec!["snake_case", "and", "dash"]);

        let digits = RegexLineParser::new(r"\d+").unwrap();
        assert_eq!(words(&digits, "a1b22c333"), vec!["1", "22", "333"]);
    }

    #[test]
    fn regex_parser_rejects_invalid_pattern() {
        let err = RegexLineParser::new("(unclosed").unwrap_err();
        assert!(matches!(err, ParserError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn unicode_words_follow_word_boundaries() {
        let parser = UnicodeWordsLineParser;
        assert_eq!(
            words(&parser, "The quick (\"brown\") fox can't jump 32.3 feet"),
            vec!["The", "quick", "brown", "fox", "can't", "jump", "32.3", "feet"]
        );
    }

    #[test]
    fn shared_parsers_delegate() {
        let parser: Arc<dyn LineParser> = Arc::new(WordCharacterParser::alphanumeric());
        assert_eq!(words(&parser, "x y"), vec!["x", "y"]);
    }
}
