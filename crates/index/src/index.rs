use crate::comparer::WordComparison;
use crate::document::{Document, IndexedDocument, Word, WordDocuments};
use crate::error::Result;
use crate::guarded::GuardedIndex;
use crate::locking::LockingStrategy;
use crate::persistent::PersistentIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query side of an index. Every call observes one complete index state.
pub trait ReadOnlyIndex: Send + Sync {
    fn word_comparison(&self) -> WordComparison;

    /// Documents under `word`; empty when the word is not indexed.
    fn get_exact(&self, word: &str) -> WordDocuments;

    /// Entries whose word starts with `prefix`, in word order.
    fn get_prefix(&self, prefix: &str) -> Vec<WordDocuments>;

    /// Entries whose word satisfies `predicate`. Full scan.
    fn get_matching(&self, predicate: &dyn Fn(&str) -> bool) -> Vec<WordDocuments>;

    /// Words with at least one document, in word order.
    fn get_indexed_words(&self) -> Vec<Word>;

    /// Number of indexed words.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct indexed documents.
    fn document_count(&self) -> usize;

    /// Independent read view of the current state, unaffected by later writes.
    fn snapshot(&self) -> Arc<dyn ReadOnlyIndex>;
}

/// Mutable word to document index.
///
/// Writes are atomic with respect to every read: queries and snapshots see either the state
/// before a write or the state after it.
pub trait Index: ReadOnlyIndex {
    /// Replaces the word set of `document`. An empty set retracts the document.
    fn merge(&self, document: &Document, words: Vec<Word>) -> Result<()>;

    fn merge_indexed(&self, indexed: IndexedDocument) -> Result<()> {
        self.merge(&indexed.document, indexed.words)
    }

    /// Retracts every document matching `predicate`; returns how many were removed.
    fn remove_matching(&self, predicate: &dyn Fn(&Document) -> bool) -> Result<usize>;
}

/// Which index implementation backs an indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexLocking {
    /// Immutable states swapped atomically: lock-free reads and O(1) snapshots, every write
    /// rebuilds the word list.
    #[default]
    Persistent,
    /// One mutex for reads and writes: cheapest writes, reads serialize, O(n) snapshots.
    Exclusive,
    /// Shared reads, exclusive writes, waiting readers ahead of waiting writers, O(n)
    /// snapshots.
    PrioritizedReadWrite,
}

impl IndexLocking {
    pub const ALL: [Self; 3] = [Self::Persistent, Self::Exclusive, Self::PrioritizedReadWrite];
}

#[must_use]
pub fn create_index(comparison: WordComparison, locking: IndexLocking) -> Arc<dyn Index> {
    match locking {
        IndexLocking::Persistent => Arc::new(PersistentIndex::new(comparison)),
        IndexLocking::Exclusive => Arc::new(GuardedIndex::new(comparison, LockingStrategy::Exclusive)),
        IndexLocking::PrioritizedReadWrite => Arc::new(GuardedIndex::new(
            comparison,
            LockingStrategy::PrioritizedReadWrite,
        )),
    }
}
