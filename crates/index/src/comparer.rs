use crate::document::Word;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::Chars;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::{Decompositions, UnicodeNormalization};

/// Named word comparison modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordComparison {
    /// Code point order, case-sensitive.
    Ordinal,
    /// Code point order of the lowercase fold.
    #[default]
    OrdinalIgnoreCase,
    /// Compatibility-folded, accents and ligatures collapsed, case as a tie-breaker.
    InvariantCulture,
    /// Compatibility-folded, accents and ligatures collapsed, case-insensitive.
    InvariantCultureIgnoreCase,
}

impl WordComparison {
    pub const ALL: [Self; 4] = [
        Self::Ordinal,
        Self::OrdinalIgnoreCase,
        Self::InvariantCulture,
        Self::InvariantCultureIgnoreCase,
    ];

    #[must_use]
    pub const fn is_case_sensitive(self) -> bool {
        matches!(self, Self::Ordinal | Self::InvariantCulture)
    }

    const fn is_invariant(self) -> bool {
        matches!(
            self,
            Self::InvariantCulture | Self::InvariantCultureIgnoreCase
        )
    }
}

/// Total order over words for one [`WordComparison`] mode.
///
/// Besides the full order the comparer exposes a coarser *primary* order (the case-insensitive
/// fold for [`WordComparison::InvariantCulture`], the full order otherwise). All words sharing
/// a primary prefix are contiguous under the full order, which is what prefix scans rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WordComparer {
    comparison: WordComparison,
}

impl WordComparer {
    #[must_use]
    pub const fn new(comparison: WordComparison) -> Self {
        Self { comparison }
    }

    #[must_use]
    pub const fn comparison(&self) -> WordComparison {
        self.comparison
    }

    #[must_use]
    pub fn compare(&self, left: &str, right: &str) -> Ordering {
        match self.comparison {
            WordComparison::Ordinal => left.cmp(right),
            WordComparison::OrdinalIgnoreCase | WordComparison::InvariantCultureIgnoreCase => {
                self.fold(left, true).cmp(self.fold(right, true))
            }
            WordComparison::InvariantCulture => self
                .fold(left, true)
                .cmp(self.fold(right, true))
                .then_with(|| self.fold(left, false).cmp(self.fold(right, false))),
        }
    }

    #[must_use]
    pub fn eq(&self, left: &str, right: &str) -> bool {
        self.compare(left, right) == Ordering::Equal
    }

    /// Order used to locate the first candidate of a prefix scan.
    #[must_use]
    pub fn compare_primary(&self, left: &str, right: &str) -> Ordering {
        match self.comparison {
            WordComparison::Ordinal => left.cmp(right),
            _ => self.fold(left, true).cmp(self.fold(right, true)),
        }
    }

    #[must_use]
    pub fn starts_with(&self, word: &str, prefix: &str) -> bool {
        match self.comparison {
            WordComparison::Ordinal => word.starts_with(prefix),
            WordComparison::InvariantCulture => {
                folded_starts_with(self.fold(word, false), self.fold(prefix, false))
            }
            _ => folded_starts_with(self.fold(word, true), self.fold(prefix, true)),
        }
    }

    /// Prefix test under the primary order; a superset of [`Self::starts_with`].
    #[must_use]
    pub fn starts_with_primary(&self, word: &str, prefix: &str) -> bool {
        match self.comparison {
            WordComparison::Ordinal => word.starts_with(prefix),
            _ => folded_starts_with(self.fold(word, true), self.fold(prefix, true)),
        }
    }

    /// Sorts `words` by this comparer and drops words equal to their predecessor.
    pub fn sort_dedup(&self, words: &mut Vec<Word>) {
        words.sort_by(|a, b| self.compare(a, b));
        words.dedup_by(|a, b| self.eq(a, b));
    }

    fn fold<'a>(&self, text: &'a str, lowercase: bool) -> Folded<'a> {
        Folded::new(text, self.comparison.is_invariant(), lowercase)
    }
}

fn folded_starts_with(mut word: Folded<'_>, prefix: Folded<'_>) -> bool {
    for expected in prefix {
        if word.next() != Some(expected) {
            return false;
        }
    }
    true
}

enum FoldSource<'a> {
    Plain(Chars<'a>),
    Decomposed(Decompositions<Chars<'a>>),
}

/// Character stream of a word after case and compatibility folding.
struct Folded<'a> {
    source: FoldSource<'a>,
    lowercase: bool,
    buffer: [char; 6],
    len: usize,
    pos: usize,
}

impl<'a> Folded<'a> {
    fn new(text: &'a str, invariant: bool, lowercase: bool) -> Self {
        let source = if invariant {
            FoldSource::Decomposed(text.nfkd())
        } else {
            FoldSource::Plain(text.chars())
        };
        Self {
            source,
            lowercase,
            buffer: ['\0'; 6],
            len: 0,
            pos: 0,
        }
    }

    fn push(&mut self, c: char) {
        if self.lowercase {
            for lower in c.to_lowercase() {
                self.buffer[self.len] = lower;
                self.len += 1;
            }
        } else {
            self.buffer[self.len] = c;
            self.len += 1;
        }
    }
}

impl Iterator for Folded<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        if self.pos < self.len {
            let c = self.buffer[self.pos];
            self.pos += 1;
            return Some(c);
        }

        loop {
            let c = match &mut self.source {
                FoldSource::Plain(chars) => chars.next()?,
                FoldSource::Decomposed(chars) => {
                    let c = chars.next()?;
                    if is_combining_mark(c) {
                        continue;
                    }
                    c
                }
            };
            self.len = 0;
            self.pos = 0;
            match expand_ligature(c) {
                Some((first, second)) if matches!(self.source, FoldSource::Decomposed(_)) => {
                    self.push(first);
                    self.push(second);
                }
                _ => self.push(c),
            }
            if self.len > 0 {
                self.pos = 1;
                return Some(self.buffer[0]);
            }
        }
    }
}

// Ligatures NFKD leaves intact.
const fn expand_ligature(c: char) -> Option<(char, char)> {
    match c {
        'œ' => Some(('o', 'e')),
        'Œ' => Some(('O', 'E')),
        'æ' => Some(('a', 'e')),
        'Æ' => Some(('A', 'E')),
        'ß' => Some(('s', 's')),
        _ => None,
    }
}
