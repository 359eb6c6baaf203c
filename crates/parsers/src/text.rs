use crate::line::{LineParser, WordCharacterParser};
use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::Arc;

/// Produces the words of a whole text stream.
///
/// The returned iterator is lazy and finite; dropping it stops reading. Read failures are
/// yielded as `Err` items and end the stream.
pub trait TextParser: Send + Sync {
    fn extract_words<'a>(&'a self, reader: &'a mut dyn BufRead) -> Words<'a>;
}

impl<P: TextParser + ?Sized> TextParser for Arc<P> {
    fn extract_words<'a>(&'a self, reader: &'a mut dyn BufRead) -> Words<'a> {
        (**self).extract_words(reader)
    }
}

/// Lazy word stream over a reader.
pub struct Words<'a> {
    inner: Box<dyn Iterator<Item = io::Result<String>> + 'a>,
}

impl<'a> Words<'a> {
    pub fn new(inner: impl Iterator<Item = io::Result<String>> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Iterator for Words<'_> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Reads the stream line by line and splits each line with a [`LineParser`].
///
/// Lines are decoded as UTF-8; invalid sequences are replaced rather than failing the stream.
#[derive(Debug, Clone)]
pub struct LineTextParser<P = Arc<dyn LineParser>> {
    line_parser: P,
}

impl<P: LineParser> LineTextParser<P> {
    pub const fn new(line_parser: P) -> Self {
        Self { line_parser }
    }

    #[must_use]
    pub const fn line_parser(&self) -> &P {
        &self.line_parser
    }
}

impl Default for LineTextParser<WordCharacterParser> {
    fn default() -> Self {
        Self::new(WordCharacterParser::alphanumeric())
    }
}

impl<P: LineParser> TextParser for LineTextParser<P> {
    fn extract_words<'a>(&'a self, reader: &'a mut dyn BufRead) -> Words<'a> {
        Words::new(LineWords {
            parser: &self.line_parser,
            reader,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        })
    }
}

struct LineWords<'a, P> {
    parser: &'a P,
    reader: &'a mut dyn BufRead,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

impl<P: LineParser> LineWords<'_, P> {
    /// Reads lines until one produces words. Returns `Ok(false)` at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        while self.pending.is_empty() {
            self.buffer.clear();
            if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
                return Ok(false);
            }
            let line = String::from_utf8_lossy(&self.buffer);
            let line = line.trim_end_matches(['\n', '\r']);
            self.pending
                .extend(self.parser.extract_words(line).map(str::to_string));
        }
        Ok(true)
    }
}

impl<P: LineParser> Iterator for LineWords<'_, P> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.fill() {
            Ok(true) => self.pending.pop_front().map(Ok),
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
