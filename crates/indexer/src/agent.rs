use crate::config::AgentConfig;
use crate::error::{DocumentError, IndexerError, Result, SourceError};
use crate::source::{read_words, DocumentResult, DocumentSource, DocumentStream};
use futures::StreamExt;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use textindex_core::{Document, Index, SourceId, Word, WordComparer};
use textindex_parsers::TextParser;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

const FAILURE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Stopped,
    /// Documents are being parsed or merged.
    Indexing,
    /// Nothing outstanding, waiting for changes.
    Watching,
    /// The source's discovery or change feed failed. Restart with stop then start.
    Failed,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Indexing => "indexing",
            Self::Watching => "watching",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Monotonic counters of an agent. They are not reset by stop and start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgentProgress {
    /// Documents reported by discovery.
    pub found: u64,
    /// Distinct documents per change batch.
    pub changed: u64,
    /// Documents parsed and merged.
    pub parsed: u64,
    /// Documents given up on.
    pub failed: u64,
}

#[derive(Debug, Clone)]
pub struct AgentStatus {
    pub state: AgentState,
    pub progress: AgentProgress,
    pub error: Option<SourceError>,
}

impl AgentStatus {
    const fn initial() -> Self {
        Self {
            state: AgentState::Stopped,
            progress: AgentProgress {
                found: 0,
                changed: 0,
                parsed: 0,
                failed: 0,
            },
            error: None,
        }
    }
}

/// A document that could not be indexed. The agent keeps running.
#[derive(Debug, Clone)]
pub struct DocumentFailure {
    pub document: Document,
    pub error: DocumentError,
}

/// Keeps one [`DocumentSource`] merged into a shared [`Index`].
///
/// ```text
/// find_all_documents ──► batch (window | size) ──┐
///                                                ├──► queue ──► parse ≤ N ──► merge
/// watch_for_changes ───► batch (window, dedup) ──┘
/// ```
///
/// Handles are cheap to clone. Dropping the last handle stops the agent.
#[derive(Clone)]
pub struct IndexingAgent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl Drop for AgentInner {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

struct Shared {
    source: Arc<dyn DocumentSource>,
    index: Arc<dyn Index>,
    parser: Arc<dyn TextParser>,
    comparer: WordComparer,
    config: AgentConfig,
    counters: Counters,
    lifecycle: Mutex<Lifecycle>,
    // merges hold it shared; stop takes it exclusively so no merge of a stopped run lands later
    merge_gate: RwLock<()>,
    status_tx: watch::Sender<AgentStatus>,
    failure_tx: broadcast::Sender<DocumentFailure>,
}

#[derive(Default)]
struct Counters {
    found: AtomicU64,
    changed: AtomicU64,
    parsed: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> AgentProgress {
        AgentProgress {
            found: self.found.load(Ordering::Relaxed),
            changed: self.changed.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

struct Lifecycle {
    run: Option<Run>,
    state: AgentState,
    error: Option<SourceError>,
    last_generation: u64,
}

struct Run {
    generation: u64,
    cancel: CancellationToken,
}

impl IndexingAgent {
    /// Creates a stopped agent. Must be called within a tokio runtime, which later runs the
    /// pipeline.
    pub fn new(
        source: Arc<dyn DocumentSource>,
        index: Arc<dyn Index>,
        parser: Arc<dyn TextParser>,
        config: AgentConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| IndexerError::NoRuntime)?;
        config.validate()?;

        let (status_tx, _) = watch::channel(AgentStatus::initial());
        let (failure_tx, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        let comparer = WordComparer::new(index.word_comparison());

        Ok(Self {
            inner: Arc::new(AgentInner {
                shared: Arc::new(Shared {
                    source,
                    index,
                    parser,
                    comparer,
                    config,
                    counters: Counters::default(),
                    lifecycle: Mutex::new(Lifecycle {
                        run: None,
                        state: AgentState::Stopped,
                        error: None,
                        last_generation: 0,
                    }),
                    merge_gate: RwLock::new(()),
                    status_tx,
                    failure_tx,
                }),
                runtime,
            }),
        })
    }

    /// Starts discovery and watching. Does nothing while a run exists, including a failed one.
    pub fn start_indexing(&self) {
        let shared = &self.inner.shared;
        let (generation, cancel) = {
            let mut lifecycle = shared.lifecycle.lock();
            if lifecycle.run.is_some() {
                return;
            }
            lifecycle.last_generation += 1;
            let generation = lifecycle.last_generation;
            let cancel = CancellationToken::new();
            lifecycle.run = Some(Run {
                generation,
                cancel: cancel.clone(),
            });
            lifecycle.state = AgentState::Indexing;
            lifecycle.error = None;
            shared.publish(&lifecycle);
            (generation, cancel)
        };

        info!("Indexing agent started for {}", shared.source.describe());
        self.inner
            .runtime
            .spawn(run_pipeline(Arc::clone(shared), generation, cancel));
    }

    /// Cancels all work of the current run and clears a recorded failure. No merge of the
    /// cancelled run is applied once this returns.
    pub fn stop_indexing(&self) {
        self.inner.shared.stop();
    }

    #[must_use]
    pub fn state(&self) -> AgentState {
        self.inner.shared.lifecycle.lock().state
    }

    /// Source failure retained while the agent is [`AgentState::Failed`].
    #[must_use]
    pub fn error(&self) -> Option<SourceError> {
        self.inner.shared.lifecycle.lock().error.clone()
    }

    #[must_use]
    pub fn progress(&self) -> AgentProgress {
        self.inner.shared.counters.snapshot()
    }

    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.inner.shared.status_tx.borrow().clone()
    }

    #[must_use]
    pub fn status_stream(&self) -> watch::Receiver<AgentStatus> {
        self.inner.shared.status_tx.subscribe()
    }

    /// Per-document failures from now on. Slow receivers lose the oldest entries.
    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<DocumentFailure> {
        self.inner.shared.failure_tx.subscribe()
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn DocumentSource> {
        &self.inner.shared.source
    }

    #[must_use]
    pub fn source_id(&self) -> SourceId {
        self.inner.shared.source.id()
    }

    #[must_use]
    pub fn index(&self) -> &Arc<dyn Index> {
        &self.inner.shared.index
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.inner.shared.config
    }

    /// Whether both handles refer to the same agent.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for IndexingAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexingAgent")
            .field("source", &self.inner.shared.source.describe())
            .field("state", &self.state())
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn publish(&self, lifecycle: &Lifecycle) {
        self.status_tx.send_replace(AgentStatus {
            state: lifecycle.state,
            progress: self.counters.snapshot(),
            error: lifecycle.error.clone(),
        });
    }

    fn publish_progress(&self) {
        let lifecycle = self.lifecycle.lock();
        self.publish(&lifecycle);
    }

    fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            let Some(run) = lifecycle.run.take() else {
                return;
            };
            run.cancel.cancel();
            lifecycle.state = AgentState::Stopped;
            lifecycle.error = None;
            self.publish(&lifecycle);
        }
        // waits for merges already past their cancellation check
        drop(self.merge_gate.write());
        info!("Indexing agent stopped for {}", self.source.describe());
    }

    /// Moves a live run between `Indexing` and `Watching`.
    fn set_state(&self, generation: u64, state: AgentState) {
        let mut lifecycle = self.lifecycle.lock();
        let current = lifecycle.run.as_ref().map(|run| run.generation);
        if current != Some(generation)
            || lifecycle.state == AgentState::Failed
            || lifecycle.state == state
        {
            return;
        }
        lifecycle.state = state;
        self.publish(&lifecycle);
        drop(lifecycle);
        debug!("{} is {state}", self.source.describe());
    }

    fn fail(&self, generation: u64, err: SourceError) {
        let mut lifecycle = self.lifecycle.lock();
        let Some(run) = lifecycle.run.as_ref().filter(|run| run.generation == generation) else {
            return;
        };
        run.cancel.cancel();
        lifecycle.state = AgentState::Failed;
        lifecycle.error = Some(err.clone());
        self.publish(&lifecycle);
        drop(lifecycle);
        error!("Indexing agent failed for {}: {err}", self.source.describe());
    }

    fn record_found(&self, count: usize) {
        self.counters.found.fetch_add(count as u64, Ordering::Relaxed);
        self.publish_progress();
    }

    fn record_changed(&self, count: usize) {
        self.counters.changed.fetch_add(count as u64, Ordering::Relaxed);
        self.publish_progress();
    }

    fn record_parsed(&self) {
        self.counters.parsed.fetch_add(1, Ordering::Relaxed);
        self.publish_progress();
    }

    fn record_failure(&self, document: Document, error: DocumentError) {
        warn!("Failed to index {document}: {error}");
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        let _ = self.failure_tx.send(DocumentFailure { document, error });
        self.publish_progress();
    }
}

enum Feed {
    Discovered(Vec<Document>),
    Changed(Vec<Document>),
    DiscoveryCompleted,
}

async fn run_pipeline(shared: Arc<Shared>, generation: u64, cancel: CancellationToken) {
    let (feed_tx, feed_rx) = mpsc::channel(shared.config.feed_capacity);
    tokio::join!(
        feed_documents(Arc::clone(&shared), generation, feed_tx, cancel.clone()),
        process_documents(Arc::clone(&shared), generation, feed_rx, cancel),
    );
    debug!("Pipeline run {generation} of {} finished", shared.source.describe());
}

/// Coalesces documents over a time window.
struct Batch {
    window: Duration,
    limit: usize,
    deadline: Option<Instant>,
    documents: Vec<Document>,
    seen: Option<HashSet<Document>>,
}

impl Batch {
    fn new(window: Duration, limit: usize, dedup: bool) -> Self {
        Self {
            window,
            limit,
            deadline: None,
            documents: Vec::new(),
            seen: dedup.then(HashSet::new),
        }
    }

    /// Adds a document and returns whether the batch is full.
    fn push(&mut self, document: Document) -> bool {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(document.clone()) {
                return false;
            }
        }
        let window = self.window;
        self.deadline.get_or_insert_with(|| Instant::now() + window);
        self.documents.push(document);
        self.documents.len() >= self.limit
    }

    fn take(&mut self) -> Vec<Document> {
        self.deadline = None;
        if let Some(seen) = &mut self.seen {
            seen.clear();
        }
        mem::take(&mut self.documents)
    }

    const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

async fn next_document(stream: &mut Option<DocumentStream>) -> Option<DocumentResult> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Reads both source feeds, batches them and hands the batches to the workers. A feed
/// error fails the run.
async fn feed_documents(
    shared: Arc<Shared>,
    generation: u64,
    feed_tx: mpsc::Sender<Feed>,
    cancel: CancellationToken,
) {
    let config = &shared.config;
    let mut discovery = Some(shared.source.find_all_documents());
    let mut changes = Some(shared.source.watch_for_changes());
    let mut found = Batch::new(config.batch_window, config.discovery_batch_size, false);
    let mut changed = Batch::new(config.batch_window, usize::MAX, true);

    loop {
        let found_deadline = found.deadline();
        let changed_deadline = changed.deadline();

        let feed = tokio::select! {
            () = cancel.cancelled() => return,
            item = next_document(&mut discovery) => match item {
                Some(Ok(document)) => {
                    if !found.push(document) {
                        continue;
                    }
                    Feed::Discovered(found.take())
                }
                Some(Err(err)) => {
                    shared.fail(generation, err);
                    return;
                }
                None => {
                    discovery = None;
                    let remaining = found.take();
                    if !remaining.is_empty() && !send_feed(&shared, &feed_tx, Feed::Discovered(remaining)).await {
                        return;
                    }
                    debug!("Discovery completed for {}", shared.source.describe());
                    Feed::DiscoveryCompleted
                }
            },
            item = next_document(&mut changes) => match item {
                Some(Ok(document)) => {
                    changed.push(document);
                    continue;
                }
                Some(Err(err)) => {
                    shared.fail(generation, err);
                    return;
                }
                None => {
                    debug!("Change feed ended for {}", shared.source.describe());
                    changes = None;
                    continue;
                }
            },
            () = sleep_until(found_deadline) => Feed::Discovered(found.take()),
            () = sleep_until(changed_deadline) => Feed::Changed(changed.take()),
        };

        if !send_feed(&shared, &feed_tx, feed).await {
            return;
        }
    }
}

/// Counts and forwards one feed item; `false` once the workers are gone.
async fn send_feed(shared: &Shared, feed_tx: &mpsc::Sender<Feed>, feed: Feed) -> bool {
    match &feed {
        Feed::Discovered(documents) => shared.record_found(documents.len()),
        Feed::Changed(documents) => shared.record_changed(documents.len()),
        Feed::DiscoveryCompleted => {}
    }
    feed_tx.send(feed).await.is_ok()
}

/// Parses and merges queued documents with bounded concurrency and tracks whether the run
/// is indexing or watching.
async fn process_documents(
    shared: Arc<Shared>,
    generation: u64,
    mut feed_rx: mpsc::Receiver<Feed>,
    cancel: CancellationToken,
) {
    let limit = shared.config.max_concurrency;
    let mut queue: VecDeque<Document> = VecDeque::new();
    let mut tasks = JoinSet::new();
    let mut feed_open = true;
    let mut discovery_completed = false;
    let mut idle_deadline: Option<Instant> = None;
    let mut idle = false;

    loop {
        while tasks.len() < limit {
            let Some(document) = queue.pop_front() else {
                break;
            };
            tasks.spawn(index_document(
                Arc::clone(&shared),
                document,
                cancel.clone(),
            ));
        }

        if !tasks.is_empty() {
            idle = false;
            idle_deadline = None;
            shared.set_state(generation, AgentState::Indexing);
        } else if discovery_completed && !idle && idle_deadline.is_none() {
            idle_deadline = Some(Instant::now() + shared.config.quiescence);
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            feed = feed_rx.recv(), if feed_open && queue.is_empty() => match feed {
                Some(Feed::Discovered(documents) | Feed::Changed(documents)) => {
                    queue.extend(documents);
                }
                Some(Feed::DiscoveryCompleted) => discovery_completed = true,
                None => feed_open = false,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(err) = joined {
                    if err.is_panic() {
                        error!("Indexing task panicked for {}: {err}", shared.source.describe());
                    }
                }
            }
            () = sleep_until(idle_deadline) => {
                idle = true;
                idle_deadline = None;
                shared.set_state(generation, AgentState::Watching);
            }
        }
    }

    tasks.abort_all();
}

async fn index_document(shared: Arc<Shared>, document: Document, cancel: CancellationToken) {
    let words = match parse_document(&shared, &document, &cancel).await {
        Ok(Some(words)) => words,
        Ok(None) => return,
        Err(err) => {
            if !cancel.is_cancelled() {
                shared.record_failure(document, err);
            }
            return;
        }
    };

    let merge = {
        let shared = Arc::clone(&shared);
        let document = document.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let _gate = shared.merge_gate.read();
            if cancel.is_cancelled() {
                return Ok(false);
            }
            shared.index.merge(&document, words).map(|()| true)
        })
    };

    match merge.await {
        Ok(Ok(true)) => shared.record_parsed(),
        Ok(Ok(false)) => {}
        Ok(Err(err)) => shared.record_failure(document, err.into()),
        Err(err) => shared.record_failure(document, DocumentError::Task(err.to_string())),
    }
}

/// Reads the words of `document`, retrying I/O failures. A document that cannot be accessed
/// has no words. `Ok(None)` when cancelled.
async fn parse_document(
    shared: &Arc<Shared>,
    document: &Document,
    cancel: &CancellationToken,
) -> std::result::Result<Option<Vec<Word>>, DocumentError> {
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let read = {
            let shared = Arc::clone(shared);
            let document = document.clone();
            tokio::task::spawn_blocking(move || {
                read_words(&*shared.source, &document, &*shared.parser, shared.comparer)
            })
        };

        match read.await.map_err(|err| DocumentError::Task(err.to_string()))? {
            Ok(words) => return Ok(Some(words)),
            Err(SourceError::AccessDenied { path }) => {
                debug!("Access denied to {path}, indexing it without words");
                return Ok(Some(Vec::new()));
            }
            Err(err) if err.is_retryable() && attempt < shared.config.parse_retries => {
                attempt += 1;
                debug!(
                    "Retrying {document} ({attempt}/{}): {err}",
                    shared.config.parse_retries
                );
                tokio::select! {
                    () = cancel.cancelled() => return Ok(None),
                    () = time::sleep(shared.config.retry_delay) => {}
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}
