//! # Text Indexer
//!
//! Keeps document sources merged into a shared word index.
//!
//! ## Pipeline
//!
//! ```text
//! IndexerSet ── owns ──> Arc<dyn Index>
//!     │
//!     └──> IndexingAgent (one per source)
//!            ├─> find_all_documents   (batched by window or size)
//!            ├─> watch_for_changes    (batched by window, de-duplicated)
//!            ├─> TextParser           (bounded concurrency, I/O retries)
//!            └─> Index::merge
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use textindex_indexer::{DirectoryDocumentSource, IndexerSet};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let set = IndexerSet::new()?;
//!     let source = DirectoryDocumentSource::new("/path/to/notes", "*.txt")?;
//!     let agent = set.add_source(Arc::new(source), true)?;
//!
//!     let mut status = agent.status_stream();
//!     status.changed().await?;
//!     println!("{}: {:?}", agent.state(), agent.progress());
//!     Ok(())
//! }
//! ```

mod agent;
mod config;
mod error;
mod set;
mod source;
mod sources;

pub use agent::{AgentProgress, AgentState, AgentStatus, DocumentFailure, IndexingAgent};
pub use config::{AgentConfig, IndexerConfig, IndexerOptions, ParserConfig};
pub use error::{DocumentError, IndexerError, Result, SourceError};
pub use set::IndexerSet;
pub use source::{read_words, DocumentReader, DocumentResult, DocumentSource, DocumentStream};
pub use sources::{DirectoryDocumentSource, SearchPattern, SingleFileDocumentSource};
