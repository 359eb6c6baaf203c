use crate::comparer::{WordComparer, WordComparison};
use crate::document::{Document, Word, WordDocuments};
use crate::error::{IndexError, Result};
use crate::index::{Index, ReadOnlyIndex};
use crate::sorted_list::SortedWordList;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

type DocumentSet = Arc<HashSet<Document>>;

/// One immutable index state. Never mutated after publication.
#[derive(Debug)]
struct State {
    words: SortedWordList<DocumentSet>,
    documents: DocumentSet,
}

impl State {
    fn empty(comparer: WordComparer) -> Self {
        Self {
            words: SortedWordList::new(comparer),
            documents: Arc::default(),
        }
    }

    fn get_exact(&self, word: &str) -> WordDocuments {
        let found = self
            .words
            .binary_search(word)
            .ok()
            .and_then(|index| self.words.entry_at(index));
        match found {
            Some((indexed, documents)) => WordDocuments::new(indexed.clone(), Arc::clone(documents)),
            None => WordDocuments::empty(word),
        }
    }

    fn get_prefix(&self, prefix: &str) -> Vec<WordDocuments> {
        self.words
            .prefix_range(prefix)
            .map(|(word, documents)| WordDocuments::new(word.clone(), Arc::clone(documents)))
            .collect()
    }

    fn get_matching(&self, predicate: &dyn Fn(&str) -> bool) -> Vec<WordDocuments> {
        self.words
            .iter()
            .filter(|(word, _)| predicate(word))
            .map(|(word, documents)| WordDocuments::new(word.clone(), Arc::clone(documents)))
            .collect()
    }

    fn get_indexed_words(&self) -> Vec<Word> {
        self.words.words().cloned().collect()
    }
}

/// Index over immutable states published through an atomic pointer swap.
///
/// Reads load the current state without locking. Writers serialize on a mutex, build a new
/// state from the current one and swap it in; entries the write does not touch share their
/// document sets with the previous state.
pub struct PersistentIndex {
    comparer: WordComparer,
    state: ArcSwap<State>,
    write_lock: Mutex<()>,
}

impl PersistentIndex {
    #[must_use]
    pub fn new(comparison: WordComparison) -> Self {
        let comparer = WordComparer::new(comparison);
        Self {
            comparer,
            state: ArcSwap::from_pointee(State::empty(comparer)),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn comparer(&self) -> WordComparer {
        self.comparer
    }
}

impl ReadOnlyIndex for PersistentIndex {
    fn word_comparison(&self) -> WordComparison {
        self.comparer.comparison()
    }

    fn get_exact(&self, word: &str) -> WordDocuments {
        self.state.load().get_exact(word)
    }

    fn get_prefix(&self, prefix: &str) -> Vec<WordDocuments> {
        self.state.load().get_prefix(prefix)
    }

    fn get_matching(&self, predicate: &dyn Fn(&str) -> bool) -> Vec<WordDocuments> {
        self.state.load().get_matching(predicate)
    }

    fn get_indexed_words(&self) -> Vec<Word> {
        self.state.load().get_indexed_words()
    }

    fn len(&self) -> usize {
        self.state.load().words.len()
    }

    fn document_count(&self) -> usize {
        self.state.load().documents.len()
    }

    fn snapshot(&self) -> Arc<dyn ReadOnlyIndex> {
        Arc::new(PersistentSnapshot {
            comparer: self.comparer,
            state: self.state.load_full(),
        })
    }
}

impl Index for PersistentIndex {
    fn merge(&self, document: &Document, mut words: Vec<Word>) -> Result<()> {
        self.comparer.sort_dedup(&mut words);

        let _writer = self.write_lock.lock();
        let current = self.state.load_full();

        let was_present = match current.documents.get(document) {
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
        if words.is_empty() && !was_present {
            return Ok(());
        }

        let documents = if words.is_empty() {
            let mut documents = (*current.documents).clone();
            documents.remove(document);
            Arc::new(documents)
        } else if was_present {
            Arc::clone(&current.documents)
        } else {
            let mut documents = (*current.documents).clone();
            documents.insert(document.clone());
            Arc::new(documents)
        };

        let word_count = words.len();
        let mut merged =
            SortedWordList::with_capacity(self.comparer, current.words.len() + word_count);
        let mut source = words.into_iter().peekable();
        let mut target = current.words.iter().peekable();

        loop {
            let order = match (source.peek(), target.peek()) {
                (None, None) => break,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(word), Some((indexed, _))) => self.comparer.compare(word, indexed),
            };

            match order {
                Ordering::Less => {
                    if let Some(word) = source.next() {
                        merged.push_sorted(word, Arc::new(HashSet::from([document.clone()])));
                    }
                }
                Ordering::Greater => {
                    let Some((word, indexed)) = target.next() else { break };
                    if was_present && indexed.contains(document) {
                        let mut remaining = (**indexed).clone();
                        remaining.remove(document);
                        if !remaining.is_empty() {
                            merged.push_sorted(word.clone(), Arc::new(remaining));
                        }
                    } else {
                        merged.push_sorted(word.clone(), Arc::clone(indexed));
                    }
                }
                Ordering::Equal => {
                    source.next();
                    let Some((word, indexed)) = target.next() else { break };
                    if indexed.contains(document) {
                        merged.push_sorted(word.clone(), Arc::clone(indexed));
                    } else {
                        let mut extended = (**indexed).clone();
                        extended.insert(document.clone());
                        merged.push_sorted(word.clone(), Arc::new(extended));
                    }
                }
            }
        }

        self.state.store(Arc::new(State {
            words: merged,
            documents,
        }));
        log::trace!("merged {document} under {word_count} words");
        Ok(())
    }

    fn remove_matching(&self, predicate: &dyn Fn(&Document) -> bool) -> Result<usize> {
        let _writer = self.write_lock.lock();
        let current = self.state.load_full();

        let removed: HashSet<Document> = current
            .documents
            .iter()
            .filter(|document| predicate(*document))
            .cloned()
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }

        let mut words = SortedWordList::with_capacity(self.comparer, current.words.len());
        for (word, indexed) in current.words.iter() {
            if indexed.iter().any(|document| removed.contains(document)) {
                let remaining: HashSet<Document> = indexed
                    .iter()
                    .filter(|document| !removed.contains(*document))
                    .cloned()
                    .collect();
                if !remaining.is_empty() {
                    words.push_sorted(word.clone(), Arc::new(remaining));
                }
            } else {
                words.push_sorted(word.clone(), Arc::clone(indexed));
            }
        }

        let documents = current
            .documents
            .iter()
            .filter(|document| !removed.contains(*document))
            .cloned()
            .collect();

        self.state.store(Arc::new(State {
            words,
            documents: Arc::new(documents),
        }));
        log::debug!("removed {} documents from index", removed.len());
        Ok(removed.len())
    }
}

/// Captured [`PersistentIndex`] state.
struct PersistentSnapshot {
    comparer: WordComparer,
    state: Arc<State>,
}

impl ReadOnlyIndex for PersistentSnapshot {
    fn word_comparison(&self) -> WordComparison {
        self.comparer.comparison()
    }

    fn get_exact(&self, word: &str) -> WordDocuments {
        self.state.get_exact(word)
    }

    fn get_prefix(&self, prefix: &str) -> Vec<WordDocuments> {
        self.state.get_prefix(prefix)
    }

    fn get_matching(&self, predicate: &dyn Fn(&str) -> bool) -> Vec<WordDocuments> {
        self.state.get_matching(predicate)
    }

    fn get_indexed_words(&self) -> Vec<Word> {
        self.state.get_indexed_words()
    }

    fn len(&self) -> usize {
        self.state.words.len()
    }

    fn document_count(&self) -> usize {
        self.state.documents.len()
    }

    fn snapshot(&self) -> Arc<dyn ReadOnlyIndex> {
        Arc::new(Self {
            comparer: self.comparer,
            state: Arc::clone(&self.state),
        })
    }
}
