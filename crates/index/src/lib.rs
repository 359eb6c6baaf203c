//! # Text Index Core
//!
//! In-memory inverted index from words to the documents that contain them.
//!
//! ## Data model
//!
//! ```text
//! merge(document, words)
//!     │
//!     ├──> sort + dedup words (WordComparer)
//!     │
//!     ├──> merge-join against the sorted word list
//!     │      ├─> new words get an entry
//!     │      ├─> shared words gain the document
//!     │      └─> dropped words lose it (empty entries pruned)
//!     │
//!     └──> publish
//!            ├─> Persistent: swap in a new immutable state
//!            └─> Guarded: mutate in place under Exclusive / PrioritizedReadWrite
//! ```
//!
//! ## Example
//!
//! ```
//! use textindex_core::{create_index, Document, IndexLocking, SourceId, Word, WordComparison};
//!
//! let index = create_index(WordComparison::OrdinalIgnoreCase, IndexLocking::Persistent);
//! let doc = Document::new("notes.txt", SourceId::next());
//! index.merge(&doc, vec![Word::from("cat"), Word::from("category")]).unwrap();
//!
//! assert!(index.get_exact("CAT").contains(&doc));
//! assert_eq!(index.get_prefix("cat").len(), 2);
//! ```

mod comparer;
mod document;
mod error;
mod guarded;
mod index;
mod lock;
mod locking;
mod persistent;
mod sorted_list;

pub use comparer::{WordComparer, WordComparison};
pub use document::{Document, IndexedDocument, SourceId, Word, WordDocuments};
pub use error::{IndexError, Result};
pub use guarded::GuardedIndex;
pub use index::{create_index, Index, IndexLocking, ReadOnlyIndex};
pub use lock::{PriorityGate, PriorityReadGuard, PriorityRwLock, PriorityWriteGuard};
pub use locking::LockingStrategy;
pub use persistent::PersistentIndex;
pub use sorted_list::SortedWordList;
