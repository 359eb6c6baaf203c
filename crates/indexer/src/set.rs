use crate::agent::IndexingAgent;
use crate::config::IndexerOptions;
use crate::error::{IndexerError, Result};
use crate::source::DocumentSource;
use log::info;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use textindex_core::{create_index, Document, Index, WordComparer};
use textindex_parsers::TextParser;

/// Owns the shared index and one [`IndexingAgent`] per registered source.
pub struct IndexerSet {
    index: Arc<dyn Index>,
    parser: Arc<dyn TextParser>,
    options: IndexerOptions,
    agents: Mutex<Vec<IndexingAgent>>,
}

impl IndexerSet {
    /// Set with default options: ordinal ignore-case words, persistent index, alphanumeric
    /// words.
    pub fn new() -> Result<Self> {
        Self::create(IndexerOptions::default())
    }

    pub fn create(options: IndexerOptions) -> Result<Self> {
        options.agent_config().validate()?;
        let parser = options.build_parser()?;
        let index = create_index(options.word_comparison(), options.index_locking());
        info!(
            "Created indexer set ({:?}, {:?})",
            options.word_comparison(),
            options.index_locking()
        );

        Ok(Self {
            index,
            parser,
            options,
            agents: Mutex::new(Vec::new()),
        })
    }

    /// Registers `source` and returns its agent, started when `auto_start` is set.
    ///
    /// Must be called within a tokio runtime.
    pub fn add_source(
        &self,
        source: Arc<dyn DocumentSource>,
        auto_start: bool,
    ) -> Result<IndexingAgent> {
        let agent = {
            let mut agents = self.agents.lock();
            let id = source.id();
            if agents.iter().any(|agent| agent.source_id() == id) {
                return Err(IndexerError::DuplicateSource(id));
            }
            let agent = IndexingAgent::new(
                source,
                Arc::clone(&self.index),
                Arc::clone(&self.parser),
                self.options.agent_config().clone(),
            )?;
            agents.push(agent.clone());
            agent
        };

        info!("Added source {}", agent.source().describe());
        if auto_start {
            agent.start_indexing();
        }
        Ok(agent)
    }

    /// Stops `agent` and retracts its source's documents from the index. Returns `false`
    /// when the agent does not belong to this set.
    pub fn remove_source(&self, agent: &IndexingAgent) -> Result<bool> {
        let removed = {
            let mut agents = self.agents.lock();
            let Some(position) = agents.iter().position(|known| known.ptr_eq(agent)) else {
                return Ok(false);
            };
            agents.remove(position)
        };

        removed.stop_indexing();
        let source = removed.source_id();
        let count = self.index.remove_matching(&|document: &Document| document.source() == source)?;
        info!(
            "Removed source {} and {count} documents",
            removed.source().describe()
        );
        Ok(true)
    }

    /// Registered agents in insertion order.
    #[must_use]
    pub fn sources(&self) -> Vec<IndexingAgent> {
        self.agents.lock().clone()
    }

    #[must_use]
    pub fn index(&self) -> &Arc<dyn Index> {
        &self.index
    }

    /// Parser used by every agent of this set.
    #[must_use]
    pub fn parser(&self) -> &Arc<dyn TextParser> {
        &self.parser
    }

    #[must_use]
    pub fn word_comparer(&self) -> WordComparer {
        WordComparer::new(self.options.word_comparison())
    }

    #[must_use]
    pub const fn options(&self) -> &IndexerOptions {
        &self.options
    }
}

impl fmt::Debug for IndexerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerSet")
            .field("options", &self.options)
            .field("sources", &self.agents.lock().len())
            .field("words", &self.index.len())
            .finish()
    }
}
