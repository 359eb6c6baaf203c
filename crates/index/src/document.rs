use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Normalized token under which documents are indexed.
pub type Word = Arc<str>;

/// Identity of a document source.
///
/// Allocated once per source instance with [`SourceId::next`], so two sources never share an
/// id even if they point at the same location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceId(u64);

impl SourceId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A document known to the index.
///
/// Equality and hashing use the id only (ordinal), the source is carried along so that
/// documents can be retracted per source.
#[derive(Clone)]
pub struct Document {
    id: Arc<str>,
    source: SourceId,
}

impl Document {
    pub fn new(id: impl Into<Arc<str>>, source: SourceId) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn source(&self) -> SourceId {
        self.source
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (source {})", self.id, self.source)
    }
}

/// One word together with the documents currently indexed under it.
#[derive(Debug, Clone)]
pub struct WordDocuments {
    word: Word,
    documents: Arc<HashSet<Document>>,
}

impl WordDocuments {
    pub fn new(word: Word, documents: Arc<HashSet<Document>>) -> Self {
        Self { word, documents }
    }

    pub fn empty(word: &str) -> Self {
        Self {
            word: Word::from(word),
            documents: Arc::default(),
        }
    }

    #[must_use]
    pub fn word(&self) -> &Word {
        &self.word
    }

    #[must_use]
    pub fn documents(&self) -> &HashSet<Document> {
        &self.documents
    }

    #[must_use]
    pub fn contains(&self, document: &Document) -> bool {
        self.documents.contains(document)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }
}

/// Result of parsing a document: the document and its word set, ordered and de-duplicated
/// by the index comparer. Consumed by a single merge.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub document: Document,
    pub words: Vec<Word>,
}

impl IndexedDocument {
    pub fn new(document: Document, words: Vec<Word>) -> Self {
        Self { document, words }
    }

    /// Document that contributes no words; merging it retracts the document.
    pub fn empty(document: Document) -> Self {
        Self {
            document,
            words: Vec::new(),
        }
    }
}
