//! # Text Index Parsers
//!
//! Splits document text into the words an index stores.
//!
//! ```text
//! BufRead ──> LineTextParser ──> line ──> LineParser ──> words
//!                                            ├─> WordCharacterParser (alphanumeric, punctuation)
//!                                            ├─> RegexLineParser (\w+ by default)
//!                                            └─> UnicodeWordsLineParser (UAX #29)
//! ```
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use textindex_parsers::{LineTextParser, TextParser, WordCharacterParser};
//!
//! let parser = LineTextParser::new(WordCharacterParser::alphanumeric());
//! let mut reader = Cursor::new("hello, world\nsecond line");
//! let words: Vec<String> = parser
//!     .extract_words(&mut reader)
//!     .collect::<std::io::Result<_>>()
//!     .unwrap();
//! assert_eq!(words, ["hello", "world", "second", "line"]);
//! ```

mod error;
mod line;
mod text;

pub use error::{ParserError, Result};
pub use line::{
    LineParser, RegexLineParser, UnicodeWordsLineParser, WordCharacterParser,
    DEFAULT_WORD_PATTERN,
};
pub use text::{LineTextParser, TextParser, Words};
