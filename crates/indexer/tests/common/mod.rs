#![allow(dead_code)]

use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::stream::{self, StreamExt};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use textindex_core::{Document, ReadOnlyIndex, SourceId};
use textindex_indexer::{
    AgentConfig, AgentState, AgentStatus, DocumentReader, DocumentResult, DocumentSource,
    DocumentStream, IndexerOptions, IndexerSet, IndexingAgent, SourceError,
};
use tokio::time;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fast_config() -> AgentConfig {
    AgentConfig {
        batch_window: Duration::from_millis(50),
        retry_delay: Duration::from_millis(100),
        quiescence: Duration::from_millis(200),
        ..AgentConfig::default()
    }
}

pub fn test_set() -> IndexerSet {
    IndexerSet::create(IndexerOptions::new().with_agent_config(fast_config())).unwrap()
}

pub async fn wait_until(
    agent: &IndexingAgent,
    mut done: impl FnMut(&AgentStatus) -> bool,
) -> AgentStatus {
    let mut status = agent.status_stream();
    let reached = time::timeout(Duration::from_secs(120), status.wait_for(|s| done(s)))
        .await
        .expect("agent did not reach the expected status")
        .expect("agent is gone");
    AgentStatus::clone(&reached)
}

pub async fn wait_for_state(agent: &IndexingAgent, state: AgentState) -> AgentStatus {
    wait_until(agent, |status| status.state == state).await
}

/// Ids of the documents indexed under `word`, sorted.
pub fn documents_of<I: ReadOnlyIndex + ?Sized>(index: &I, word: &str) -> Vec<String> {
    let mut ids: Vec<String> = index
        .get_exact(word)
        .iter()
        .map(|document| document.id().to_string())
        .collect();
    ids.sort();
    ids
}

enum Content {
    Text(String),
    Denied,
    Flaky { failures: u32, text: String },
}

/// In-memory source whose documents, changes and failures are driven by the test.
pub struct TestSource {
    id: SourceId,
    contents: Mutex<BTreeMap<String, Content>>,
    discovery_error: Mutex<Option<SourceError>>,
    watchers: Mutex<Vec<UnboundedSender<DocumentResult>>>,
    opens: Mutex<BTreeMap<String, u32>>,
    open_delay: Mutex<Option<Duration>>,
    opens_held: Mutex<bool>,
    opens_released: Condvar,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl TestSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: SourceId::next(),
            contents: Mutex::new(BTreeMap::new()),
            discovery_error: Mutex::new(None),
            watchers: Mutex::new(Vec::new()),
            opens: Mutex::new(BTreeMap::new()),
            open_delay: Mutex::new(None),
            opens_held: Mutex::new(false),
            opens_released: Condvar::new(),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn with_documents(documents: &[(&str, &str)]) -> Arc<Self> {
        let source = Self::new();
        for (id, text) in documents {
            source.set_text(id, text);
        }
        source
    }

    pub fn document(&self, id: &str) -> Document {
        Document::new(id, self.id)
    }

    pub fn set_text(&self, id: &str, text: &str) {
        self.contents
            .lock()
            .insert(id.to_string(), Content::Text(text.to_string()));
    }

    pub fn deny(&self, id: &str) {
        self.contents.lock().insert(id.to_string(), Content::Denied);
    }

    /// The first `failures` opens of `id` fail with an I/O error.
    pub fn flaky(&self, id: &str, failures: u32, text: &str) {
        self.contents.lock().insert(
            id.to_string(),
            Content::Flaky {
                failures,
                text: text.to_string(),
            },
        );
    }

    pub fn delete(&self, id: &str) {
        self.contents.lock().remove(id);
    }

    pub fn fail_discovery(&self, err: SourceError) {
        *self.discovery_error.lock() = Some(err);
    }

    /// Reports `id` as changed on every open change feed.
    pub fn change(&self, id: &str) {
        self.emit(Ok(self.document(id)));
    }

    pub fn fail_watch(&self, err: SourceError) {
        self.emit(Err(err));
    }

    pub fn is_watched(&self) -> bool {
        let mut watchers = self.watchers.lock();
        watchers.retain(|tx| !tx.is_closed());
        !watchers.is_empty()
    }

    pub fn opens(&self, id: &str) -> u32 {
        self.opens.lock().get(id).copied().unwrap_or(0)
    }

    /// Every open sleeps for `delay` on the calling thread.
    pub fn slow_opens(&self, delay: Duration) {
        *self.open_delay.lock() = Some(delay);
    }

    /// Opens block until [`TestSource::release_opens`].
    pub fn hold_opens(&self) {
        *self.opens_held.lock() = true;
    }

    pub fn release_opens(&self) {
        *self.opens_held.lock() = false;
        self.opens_released.notify_all();
    }

    /// Opens currently running.
    pub fn opens_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most opens that ever ran at the same time.
    pub fn peak_opens_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn read(&self, document: &Document) -> Result<Option<DocumentReader>, SourceError> {
        match self.contents.lock().get_mut(document.id()) {
            None => Ok(None),
            Some(Content::Text(text)) => Ok(Some(reader(text))),
            Some(Content::Denied) => Err(SourceError::AccessDenied {
                path: document.id().to_string(),
            }),
            Some(Content::Flaky { failures, text }) => {
                if *failures == 0 {
                    return Ok(Some(reader(text)));
                }
                *failures -= 1;
                Err(SourceError::from_io(
                    document.id(),
                    io::Error::new(io::ErrorKind::Other, "file is locked"),
                ))
            }
        }
    }

    fn emit(&self, item: DocumentResult) {
        let mut watchers = self.watchers.lock();
        watchers.retain(|tx| tx.unbounded_send(item.clone()).is_ok());
    }
}

fn reader(text: &str) -> DocumentReader {
    Box::new(Cursor::new(text.as_bytes().to_vec()))
}

impl DocumentSource for TestSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn find_all_documents(&self) -> DocumentStream {
        let mut items: Vec<DocumentResult> = self
            .contents
            .lock()
            .keys()
            .map(|id| Ok(self.document(id)))
            .collect();
        if let Some(err) = self.discovery_error.lock().clone() {
            items.push(Err(err));
        }
        stream::iter(items).boxed()
    }

    fn watch_for_changes(&self) -> DocumentStream {
        let (tx, rx) = unbounded();
        self.watchers.lock().push(tx);
        rx.boxed()
    }

    fn open(&self, document: &Document) -> Result<Option<DocumentReader>, SourceError> {
        self.ensure_own(document)?;
        *self
            .opens
            .lock()
            .entry(document.id().to_string())
            .or_default() += 1;

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        {
            let mut held = self.opens_held.lock();
            while *held {
                self.opens_released.wait(&mut held);
            }
        }
        let delay = *self.open_delay.lock();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let result = self.read(document);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
