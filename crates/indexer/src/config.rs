use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use textindex_core::{IndexLocking, WordComparison};
use textindex_parsers::{
    LineParser, LineTextParser, RegexLineParser, TextParser, UnicodeWordsLineParser,
    WordCharacterParser,
};

/// Pipeline parameters of one indexing agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Time window over which discovered or changed documents are batched.
    #[serde(with = "duration_ms")]
    pub batch_window: Duration,
    /// A discovery batch is flushed early once it holds this many documents.
    pub discovery_batch_size: usize,
    /// Documents parsed and merged at the same time.
    pub max_concurrency: usize,
    /// Extra attempts after an I/O failure while reading a document.
    pub parse_retries: u32,
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,
    /// Idle time after the last completed document before the agent reports `Watching`.
    #[serde(with = "duration_ms")]
    pub quiescence: Duration,
    /// Capacity of the channel between the source feeds and the parse workers.
    pub feed_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            batch_window: Duration::from_millis(500),
            discovery_batch_size: 50,
            max_concurrency: 8,
            parse_retries: 4,
            retry_delay: Duration::from_secs(1),
            quiescence: Duration::from_secs(1),
            feed_capacity: 64,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.discovery_batch_size == 0 {
            return Err(IndexerError::InvalidConfig(
                "discovery_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(IndexerError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.feed_capacity == 0 {
            return Err(IndexerError::InvalidConfig(
                "feed_capacity must be at least 1".to_string(),
            ));
        }
        if self.batch_window.is_zero() {
            return Err(IndexerError::InvalidConfig(
                "batch_window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Built-in tokenizers selectable from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParserConfig {
    #[default]
    Alphanumeric,
    Punctuation,
    UnicodeWords,
    Regex {
        pattern: String,
    },
}

impl ParserConfig {
    pub fn build(&self) -> Result<Arc<dyn LineParser>> {
        let parser: Arc<dyn LineParser> = match self {
            Self::Alphanumeric => Arc::new(WordCharacterParser::alphanumeric()),
            Self::Punctuation => Arc::new(WordCharacterParser::punctuation_splitting()),
            Self::UnicodeWords => Arc::new(UnicodeWordsLineParser),
            Self::Regex { pattern } => Arc::new(RegexLineParser::new(pattern)?),
        };
        Ok(parser)
    }
}

/// File representation of an indexer set.
///
/// ```toml
/// word_comparison = "ordinal_ignore_case"
/// index_locking = "persistent"
///
/// [parser]
/// kind = "regex"
/// pattern = "[A-Za-z]+"
///
/// [agent]
/// batch_window = 250
/// max_concurrency = 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub word_comparison: WordComparison,
    pub index_locking: IndexLocking,
    pub parser: ParserConfig,
    pub agent: AgentConfig,
}

impl IndexerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.agent.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IndexerError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Programmatic construction options for an indexer set.
#[derive(Clone, Default)]
pub struct IndexerOptions {
    word_comparison: WordComparison,
    index_locking: IndexLocking,
    line_parser: Option<Arc<dyn LineParser>>,
    text_parser: Option<Arc<dyn TextParser>>,
    agent: AgentConfig,
}

impl IndexerOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &IndexerConfig) -> Result<Self> {
        config.agent.validate()?;
        Ok(Self {
            word_comparison: config.word_comparison,
            index_locking: config.index_locking,
            line_parser: Some(config.parser.build()?),
            text_parser: None,
            agent: config.agent.clone(),
        })
    }

    #[must_use]
    pub fn with_word_comparison(mut self, comparison: WordComparison) -> Self {
        self.word_comparison = comparison;
        self
    }

    #[must_use]
    pub fn with_index_locking(mut self, locking: IndexLocking) -> Self {
        self.index_locking = locking;
        self
    }

    #[must_use]
    pub fn with_line_parser(mut self, parser: impl LineParser + 'static) -> Self {
        self.line_parser = Some(Arc::new(parser));
        self
    }

    #[must_use]
    pub fn with_text_parser(mut self, parser: impl TextParser + 'static) -> Self {
        self.text_parser = Some(Arc::new(parser));
        self
    }

    #[must_use]
    pub fn with_agent_config(mut self, agent: AgentConfig) -> Self {
        self.agent = agent;
        self
    }

    #[must_use]
    pub const fn word_comparison(&self) -> WordComparison {
        self.word_comparison
    }

    #[must_use]
    pub const fn index_locking(&self) -> IndexLocking {
        self.index_locking
    }

    #[must_use]
    pub const fn agent_config(&self) -> &AgentConfig {
        &self.agent
    }

    /// Text parser selected by these options; alphanumeric words when none is set.
    pub fn build_parser(&self) -> Result<Arc<dyn TextParser>> {
        let parser: Arc<dyn TextParser> = match (&self.line_parser, &self.text_parser) {
            (Some(_), Some(_)) => return Err(IndexerError::ConflictingParsers),
            (None, Some(text)) => Arc::clone(text),
            (Some(line), None) => Arc::new(LineTextParser::new(Arc::clone(line))),
            (None, None) => Arc::new(LineTextParser::new(WordCharacterParser::alphanumeric())),
        };
        Ok(parser)
    }
}

impl fmt::Debug for IndexerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerOptions")
            .field("word_comparison", &self.word_comparison)
            .field("index_locking", &self.index_locking)
            .field("line_parser", &self.line_parser.is_some())
            .field("text_parser", &self.text_parser.is_some())
            .field("agent", &self.agent)
            .finish()
    }
}

/// Durations stored as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
