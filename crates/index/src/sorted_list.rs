use crate::comparer::WordComparer;
use crate::document::Word;
use std::cmp::Ordering;

/// Vector of `(word, value)` entries kept in comparer order.
///
/// Lookups are binary searches; bulk rebuilds append already-ordered entries with
/// [`SortedWordList::push_sorted`], which is how merges produce a new list in one pass.
#[derive(Debug, Clone)]
pub struct SortedWordList<V> {
    comparer: WordComparer,
    entries: Vec<(Word, V)>,
}

impl<V> SortedWordList<V> {
    #[must_use]
    pub const fn new(comparer: WordComparer) -> Self {
        Self {
            comparer,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(comparer: WordComparer, capacity: usize) -> Self {
        Self {
            comparer,
            entries: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub const fn comparer(&self) -> WordComparer {
        self.comparer
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `Ok(index)` of the entry equal to `word`, or `Err(index)` where it would be inserted.
    pub fn binary_search(&self, word: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(key, _)| self.comparer.compare(key, word))
    }

    #[must_use]
    pub fn get(&self, word: &str) -> Option<&V> {
        self.binary_search(word)
            .ok()
            .map(|index| &self.entries[index].1)
    }

    #[must_use]
    pub fn entry_at(&self, index: usize) -> Option<(&Word, &V)> {
        self.entries.get(index).map(|(word, value)| (word, value))
    }

    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut V> {
        self.entries.get_mut(index).map(|(_, value)| value)
    }

    /// Inserts at the ordered position; returns `false` and leaves the list untouched when an
    /// equal word is already present.
    pub fn insert(&mut self, word: Word, value: V) -> bool {
        match self.binary_search(&word) {
            Ok(_) => false,
            Err(index) => {
                self.entries.insert(index, (word, value));
                true
            }
        }
    }

    /// Inserts at a position previously obtained from [`Self::binary_search`] or a merge walk.
    pub fn insert_at(&mut self, index: usize, word: Word, value: V) {
        debug_assert!(index == 0 || self.comparer.compare(&self.entries[index - 1].0, &word) == Ordering::Less);
        debug_assert!(
            index == self.entries.len()
                || self.comparer.compare(&word, &self.entries[index].0) == Ordering::Less
        );
        self.entries.insert(index, (word, value));
    }

    /// Appends an entry strictly greater than the current last one.
    pub fn push_sorted(&mut self, word: Word, value: V) {
        debug_assert!(
            self.entries
                .last()
                .map_or(true, |(last, _)| self.comparer.compare(last, &word) == Ordering::Less),
            "push_sorted requires strictly increasing words"
        );
        self.entries.push((word, value));
    }

    pub fn remove_at(&mut self, index: usize) -> (Word, V) {
        self.entries.remove(index)
    }

    pub fn retain_mut(&mut self, mut keep: impl FnMut(&Word, &mut V) -> bool) {
        self.entries.retain_mut(|(word, value)| keep(word, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Word, &V)> {
        self.entries.iter().map(|(word, value)| (word, value))
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.entries.iter().map(|(word, _)| word)
    }

    /// Ordered entries whose word starts with `prefix`.
    ///
    /// Binary-searches the first candidate under the primary order, then scans forward while
    /// the primary prefix holds, keeping the entries that match exactly.
    pub fn prefix_range<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a Word, &'a V)> + 'a {
        let comparer = self.comparer;
        let start = self
            .entries
            .partition_point(|(key, _)| comparer.compare_primary(key, prefix) == Ordering::Less);
        self.entries[start..]
            .iter()
            .take_while(move |(key, _)| comparer.starts_with_primary(key, prefix))
            .filter(move |(key, _)| comparer.starts_with(key, prefix))
            .map(|(word, value)| (word, value))
    }

    /// Copies every entry through `map`, preserving order.
    #[must_use]
    pub fn map_values<U>(&self, mut map: impl FnMut(&V) -> U) -> SortedWordList<U> {
        SortedWordList {
            comparer: self.comparer,
            entries: self
                .entries
                .iter()
                .map(|(word, value)| (word.clone(), map(value)))
                .collect(),
        }
    }
}
