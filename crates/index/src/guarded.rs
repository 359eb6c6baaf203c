use crate::comparer::{WordComparer, WordComparison};
use crate::document::{Document, Word, WordDocuments};
use crate::error::{IndexError, Result};
use crate::index::{Index, ReadOnlyIndex};
use crate::locking::{Guarded, LockingStrategy};
use crate::sorted_list::SortedWordList;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct State {
    words: SortedWordList<HashSet<Document>>,
    documents: HashSet<Document>,
}

fn to_word_documents(word: &Word, documents: &HashSet<Document>) -> WordDocuments {
    WordDocuments::new(word.clone(), Arc::new(documents.clone()))
}

/// Index over one mutable word list, updated in place under a [`LockingStrategy`].
///
/// Snapshots deep-copy every document set under a read lock, so their cost grows with the
/// index. Prefer [`crate::PersistentIndex`] when snapshots are frequent.
pub struct GuardedIndex {
    comparer: WordComparer,
    state: Guarded<State>,
}

impl GuardedIndex {
    #[must_use]
    pub fn new(comparison: WordComparison, strategy: LockingStrategy) -> Self {
        let comparer = WordComparer::new(comparison);
        Self {
            comparer,
            state: Guarded::new(
                strategy,
                State {
                    words: SortedWordList::new(comparer),
                    documents: HashSet::new(),
                },
            ),
        }
    }

    #[must_use]
    pub const fn comparer(&self) -> WordComparer {
        self.comparer
    }
}

impl ReadOnlyIndex for GuardedIndex {
    fn word_comparison(&self) -> WordComparison {
        self.comparer.comparison()
    }

    fn get_exact(&self, word: &str) -> WordDocuments {
        self.state.read(|state| match state.words.binary_search(word) {
            Ok(index) => state
                .words
                .entry_at(index)
                .map_or_else(|| WordDocuments::empty(word), |(w, d)| to_word_documents(w, d)),
            Err(_) => WordDocuments::empty(word),
        })
    }

    fn get_prefix(&self, prefix: &str) -> Vec<WordDocuments> {
        self.state.read(|state| {
            state
                .words
                .prefix_range(prefix)
                .map(|(word, documents)| to_word_documents(word, documents))
                .collect()
        })
    }

    fn get_matching(&self, predicate: &dyn Fn(&str) -> bool) -> Vec<WordDocuments> {
        self.state.read(|state| {
            state
                .words
                .iter()
                .filter(|(word, _)| predicate(word))
                .map(|(word, documents)| to_word_documents(word, documents))
                .collect()
        })
    }

    fn get_indexed_words(&self) -> Vec<Word> {
        self.state.read(|state| state.words.words().cloned().collect())
    }

    fn len(&self) -> usize {
        self.state.read(|state| state.words.len())
    }

    fn document_count(&self) -> usize {
        self.state.read(|state| state.documents.len())
    }

    fn snapshot(&self) -> Arc<dyn ReadOnlyIndex> {
        let copy = self.state.read(State::clone);
        Arc::new(Self {
            comparer: self.comparer,
            state: Guarded::Snapshot(copy),
        })
    }
}

impl Index for GuardedIndex {
    fn merge(&self, document: &Document, mut words: Vec<Word>) -> Result<()> {
        self.comparer.sort_dedup(&mut words);
        let comparer = self.comparer;

        self.state.write(|state| {
            let was_present = match state.documents.get(document) {
                Some(indexed) if indexed.source() != document.source() => {
                    return Err(IndexError::SourceMismatch {
                        id: document.id().to_string(),
                        indexed: indexed.source(),
                        incoming: document.source(),
                    });
                }
                Some(_) => true,
                None => false,
            };
            if words.is_empty() {
                if !was_present {
                    return Ok(());
                }
                state.documents.remove(document);
            } else if !was_present {
                state.documents.insert(document.clone());
            }

            let mut source = words.into_iter().peekable();
            let mut target = 0;
            loop {
                let order = match (source.peek(), state.words.entry_at(target)) {
                    (None, None) => break,
                    // nothing left to remove for a document that was not indexed
                    (None, Some(_)) if !was_present => break,
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(word), Some((indexed, _))) => comparer.compare(word, indexed),
                };

                match order {
                    Ordering::Less => {
                        if let Some(word) = source.next() {
                            state
                                .words
                                .insert_at(target, word, HashSet::from([document.clone()]));
                        }
                        target += 1;
                    }
                    Ordering::Greater => {
                        if was_present {
                            if let Some(documents) = state.words.value_at_mut(target) {
                                if documents.remove(document) && documents.is_empty() {
                                    state.words.remove_at(target);
                                    continue;
                                }
                            }
                        }
                        target += 1;
                    }
                    Ordering::Equal => {
                        source.next();
                        if let Some(documents) = state.words.value_at_mut(target) {
                            documents.insert(document.clone());
                        }
                        target += 1;
                    }
                }
            }
            Ok(())
        })?
    }

    fn remove_matching(&self, predicate: &dyn Fn(&Document) -> bool) -> Result<usize> {
        let removed = self.state.write(|state| {
            let removed: HashSet<Document> = state
                .documents
                .iter()
                .filter(|document| predicate(*document))
                .cloned()
                .collect();
            if removed.is_empty() {
                return 0;
            }

            state.documents.retain(|document| !removed.contains(document));
            state.words.retain_mut(|_, documents| {
                documents.retain(|document| !removed.contains(document));
                !documents.is_empty()
            });
            removed.len()
        })?;

        if removed > 0 {
            log::debug!("removed {removed} documents from index");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceId;

    fn words(items: &[&str]) -> Vec<Word> {
        items.iter().map(|w| Word::from(*w)).collect()
    }

    #[test]
    fn snapshot_is_read_only() {
        let index = GuardedIndex::new(WordComparison::Ordinal, LockingStrategy::Exclusive);
        let document = Document::new("doc", SourceId::next());
        index.merge(&document, words(&["one"])).unwrap();

        let snapshot = GuardedIndex {
            comparer: index.comparer,
            state: Guarded::Snapshot(index.state.read(State::clone)),
        };
        assert_eq!(
            snapshot.merge(&document, words(&["two"])),
            Err(IndexError::ReadOnly)
        );
        assert_eq!(snapshot.remove_matching(&|_| true), Err(IndexError::ReadOnly));
        assert!(snapshot.get_exact("one").contains(&document));
    }

    #[test]
    fn remerge_moves_document_between_words() {
        let index =
            GuardedIndex::new(WordComparison::Ordinal, LockingStrategy::PrioritizedReadWrite);
        let source = SourceId::next();
        let keep = Document::new("keep", source);
        let moving = Document::new("moving", source);

        index.merge(&keep, words(&["b", "d"])).unwrap();
        index.merge(&moving, words(&["a", "b", "c"])).unwrap();
        index.merge(&moving, words(&["c", "e"])).unwrap();

        let indexed: Vec<String> = index
            .get_indexed_words()
            .iter()
            .map(|w| w.to_string())
            .collect();
        assert_eq!(indexed, vec!["b", "c", "d", "e"]);
        assert!(!index.get_exact("b").contains(&moving));
        assert!(index.get_exact("b").contains(&keep));
        assert!(index.get_exact("e").contains(&moving));
    }
}
