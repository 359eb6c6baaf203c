use crate::error::SourceError;
use futures::stream::BoxStream;
use std::io::BufRead;
use textindex_core::{Document, SourceId, Word, WordComparer};
use textindex_parsers::TextParser;

pub type DocumentResult = std::result::Result<Document, SourceError>;

/// Stream of documents produced by a source. Dropping it unsubscribes.
pub type DocumentStream = BoxStream<'static, DocumentResult>;

pub type DocumentReader = Box<dyn BufRead + Send>;

/// Origin of documents for one indexing agent.
///
/// Every document a source yields carries the source's [`SourceId`]. The change feed is live
/// once `watch_for_changes` returns, so changes made before its stream is first polled are
/// still reported. Discovery may look at the source when `find_all_documents` is called or
/// when its stream is first polled.
pub trait DocumentSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Human readable location used in logs.
    fn describe(&self) -> String {
        format!("source {}", self.id())
    }

    /// Every document currently available. Finite; an `Err` item is a source-level failure.
    fn find_all_documents(&self) -> DocumentStream;

    /// Documents created, modified, deleted or renamed from now on. Runs until dropped; an
    /// `Err` item is a source-level failure.
    fn watch_for_changes(&self) -> DocumentStream;

    /// Opens the content of `document`; `Ok(None)` when it no longer exists. Blocking.
    fn open(&self, document: &Document) -> std::result::Result<Option<DocumentReader>, SourceError>;

    fn ensure_own(&self, document: &Document) -> std::result::Result<(), SourceError> {
        if document.source() == self.id() {
            Ok(())
        } else {
            Err(SourceError::ForeignDocument {
                id: document.id().to_string(),
                owner: document.source(),
                requested: self.id(),
            })
        }
    }
}

/// Reads `document` through `parser` and returns its words ordered and de-duplicated by
/// `comparer`. A document that no longer exists has no words. Blocking.
pub fn read_words(
    source: &dyn DocumentSource,
    document: &Document,
    parser: &dyn TextParser,
    comparer: WordComparer,
) -> std::result::Result<Vec<Word>, SourceError> {
    let Some(mut reader) = source.open(document)? else {
        return Ok(Vec::new());
    };

    let mut words = Vec::new();
    for word in parser.extract_words(&mut reader) {
        let word = word.map_err(|err| SourceError::from_io(document.id(), err))?;
        words.push(Word::from(word));
    }
    comparer.sort_dedup(&mut words);
    Ok(words)
}
