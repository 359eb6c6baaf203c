use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use textindex_core::{
    create_index, Document, Index, IndexLocking, ReadOnlyIndex, SourceId, Word, WordComparer,
    WordComparison,
};

const DOCUMENTS: [&str; 4] = ["doc0", "doc1", "doc2", "doc3"];
const PREFIXES: [&str; 6] = ["", "a", "A", "ab", "æ", "é"];

type Merge = (usize, Vec<String>);

fn arb_word() -> impl Strategy<Value = String> {
    "[abAæé]{1,3}"
}

fn arb_merges() -> impl Strategy<Value = Vec<Merge>> {
    prop::collection::vec(
        (0..DOCUMENTS.len(), prop::collection::vec(arb_word(), 0..5)),
        1..24,
    )
}

fn arb_comparison() -> impl Strategy<Value = WordComparison> {
    prop::sample::select(WordComparison::ALL.to_vec())
}

fn arb_locking() -> impl Strategy<Value = IndexLocking> {
    prop::sample::select(IndexLocking::ALL.to_vec())
}

/// Last word set merged per document, documents with an empty set removed.
fn apply_to_model(model: &mut HashMap<usize, Vec<String>>, (doc, words): &Merge) {
    if words.is_empty() {
        model.remove(doc);
    } else {
        model.insert(*doc, words.clone());
    }
}

fn expected_documents(
    model: &HashMap<usize, Vec<String>>,
    comparer: WordComparer,
    word: &str,
) -> BTreeSet<String> {
    model
        .iter()
        .filter(|(_, words)| words.iter().any(|w| comparer.eq(w, word)))
        .map(|(doc, _)| DOCUMENTS[*doc].to_string())
        .collect()
}

fn document_ids<I: ReadOnlyIndex + ?Sized>(index: &I, word: &str) -> BTreeSet<String> {
    index
        .get_exact(word)
        .iter()
        .map(|document| document.id().to_string())
        .collect()
}

fn indexed_words<I: ReadOnlyIndex + ?Sized>(index: &I) -> Vec<String> {
    index
        .get_indexed_words()
        .iter()
        .map(|word| word.to_string())
        .collect()
}

fn merge_all<I: Index + ?Sized>(index: &I, source: SourceId, merges: &[Merge]) {
    for (doc, words) in merges {
        let words = words.iter().map(|w| Word::from(w.as_str())).collect();
        index
            .merge(&Document::new(DOCUMENTS[*doc], source), words)
            .unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn prop_index_matches_last_merged_word_sets(
        comparison in arb_comparison(),
        locking in arb_locking(),
        merges in arb_merges(),
    ) {
        let comparer = WordComparer::new(comparison);
        let index = create_index(comparison, locking);
        merge_all(&*index, SourceId::next(), &merges);

        let mut model = HashMap::new();
        for merge in &merges {
            apply_to_model(&mut model, merge);
        }

        let mut all_words: Vec<Word> = model
            .values()
            .flatten()
            .map(|w| Word::from(w.as_str()))
            .collect();
        comparer.sort_dedup(&mut all_words);

        prop_assert_eq!(index.len(), all_words.len());
        prop_assert_eq!(index.document_count(), model.len());
        for word in &all_words {
            prop_assert_eq!(document_ids(&*index, word), expected_documents(&model, comparer, word));
        }
    }

    #[test]
    fn prop_entries_are_ordered_and_never_empty(
        comparison in arb_comparison(),
        locking in arb_locking(),
        merges in arb_merges(),
    ) {
        let comparer = WordComparer::new(comparison);
        let index = create_index(comparison, locking);
        merge_all(&*index, SourceId::next(), &merges);

        let words = index.get_indexed_words();
        for pair in words.windows(2) {
            prop_assert_eq!(comparer.compare(&pair[0], &pair[1]), std::cmp::Ordering::Less);
        }
        for entry in index.get_matching(&|_| true) {
            prop_assert!(!entry.is_empty(), "empty entry for {}", entry.word());
        }
    }

    #[test]
    fn prop_prefix_agrees_with_matching(
        comparison in arb_comparison(),
        locking in arb_locking(),
        merges in arb_merges(),
    ) {
        let comparer = WordComparer::new(comparison);
        let index = create_index(comparison, locking);
        merge_all(&*index, SourceId::next(), &merges);

        for prefix in PREFIXES {
            let by_prefix: Vec<String> = index
                .get_prefix(prefix)
                .iter()
                .map(|entry| entry.word().to_string())
                .collect();
            let by_matching: Vec<String> = index
                .get_matching(&|word| comparer.starts_with(word, prefix))
                .iter()
                .map(|entry| entry.word().to_string())
                .collect();
            prop_assert_eq!(by_prefix, by_matching, "prefix {:?}", prefix);
        }
    }

    #[test]
    fn prop_snapshot_ignores_later_merges(
        comparison in arb_comparison(),
        locking in arb_locking(),
        before in arb_merges(),
        after in arb_merges(),
    ) {
        let index = create_index(comparison, locking);
        let source = SourceId::next();
        merge_all(&*index, source, &before);

        let snapshot = index.snapshot();
        let frozen_words = indexed_words(&*snapshot);
        let frozen_documents = snapshot.document_count();
        let frozen_postings: Vec<BTreeSet<String>> = frozen_words
            .iter()
            .map(|word| document_ids(&*snapshot, word))
            .collect();

        merge_all(&*index, source, &after);

        prop_assert_eq!(indexed_words(&*snapshot), frozen_words.clone());
        prop_assert_eq!(snapshot.document_count(), frozen_documents);
        for (word, frozen) in frozen_words.iter().zip(&frozen_postings) {
            prop_assert_eq!(&document_ids(&*snapshot, word), frozen, "word {:?}", word);
        }
    }

    #[test]
    fn prop_retracting_every_document_empties_the_index(
        comparison in arb_comparison(),
        locking in arb_locking(),
        merges in arb_merges(),
    ) {
        let index = create_index(comparison, locking);
        let source = SourceId::next();
        merge_all(&*index, source, &merges);

        for id in DOCUMENTS {
            index.merge(&Document::new(id, source), Vec::new()).unwrap();
        }
        prop_assert!(index.is_empty());
        prop_assert_eq!(index.document_count(), 0);
    }

    #[test]
    fn prop_remove_matching_drops_only_selected_documents(
        comparison in arb_comparison(),
        locking in arb_locking(),
        merges in arb_merges(),
    ) {
        let comparer = WordComparer::new(comparison);
        let index = create_index(comparison, locking);
        merge_all(&*index, SourceId::next(), &merges);

        let mut model = HashMap::new();
        for merge in &merges {
            apply_to_model(&mut model, merge);
        }
        let selected = model.keys().filter(|doc| **doc % 2 == 0).count();

        let removed = index
            .remove_matching(&|document| document.id() == "doc0" || document.id() == "doc2")
            .unwrap();
        prop_assert_eq!(removed, selected);

        model.retain(|doc, _| doc % 2 == 1);
        prop_assert_eq!(index.document_count(), model.len());
        for word in index.get_indexed_words() {
            prop_assert_eq!(document_ids(&*index, &word), expected_documents(&model, comparer, &word));
        }
    }
}
