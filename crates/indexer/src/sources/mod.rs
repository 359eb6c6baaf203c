//! File system document sources.
//!
//! Document ids are file paths. Enumeration runs on the blocking pool and change feeds are
//! bridged from `notify` callbacks into tokio channels.

mod directory;
mod pattern;
mod single_file;

pub use directory::DirectoryDocumentSource;
pub use pattern::SearchPattern;
pub use single_file::SingleFileDocumentSource;

use crate::error::SourceError;
use crate::source::{DocumentReader, DocumentResult, DocumentStream};
use futures::stream::{self, StreamExt};
use log::debug;
use notify::event::EventKind;
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use textindex_core::{Document, SourceId};
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 1024;

fn document_for(path: &Path, source: SourceId) -> Document {
    Document::new(path.to_string_lossy().into_owned(), source)
}

/// Opens a file read-only; `Ok(None)` when it does not exist.
fn open_file(path: &Path) -> Result<Option<DocumentReader>, SourceError> {
    match File::open(path) {
        Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SourceError::from_io(path.to_string_lossy(), err)),
    }
}

/// Runs `produce` on the blocking pool once the stream is first polled.
///
/// The producer should stop as soon as a send fails, which means the stream was dropped.
fn blocking_stream<F>(produce: F) -> DocumentStream
where
    F: FnOnce(mpsc::Sender<DocumentResult>) + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    stream::unfold((rx, Some((tx, produce))), |(mut rx, pending)| async move {
        if let Some((tx, produce)) = pending {
            tokio::task::spawn_blocking(move || produce(tx));
        }
        rx.recv().await.map(|item| (item, (rx, None)))
    })
    .boxed()
}

/// Change feed for `path`, yielding a document for every affected path accepted by `accept`.
///
/// The watcher lives inside the stream and is released when the stream is dropped.
fn watch_path<F>(path: PathBuf, mode: RecursiveMode, source: SourceId, accept: F) -> DocumentStream
where
    F: Fn(&Path) -> bool + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            for item in translate_event(res, source, &accept) {
                if tx.blocking_send(item).is_err() {
                    return;
                }
            }
        },
        NotifyConfig::default(),
    )
    .and_then(|mut watcher| watcher.watch(&path, mode).map(|()| watcher));

    match watcher {
        Ok(watcher) => {
            debug!("watching {} for changes", path.display());
            stream::unfold((rx, watcher), |(mut rx, watcher)| async move {
                rx.recv().await.map(|item| (item, (rx, watcher)))
            })
            .boxed()
        }
        Err(err) => stream::iter([Err(SourceError::Watch(format!(
            "failed to watch {}: {err}",
            path.display()
        )))])
        .boxed(),
    }
}

fn translate_event<F>(
    res: notify::Result<Event>,
    source: SourceId,
    accept: &F,
) -> Vec<DocumentResult>
where
    F: Fn(&Path) -> bool,
{
    match res {
        Ok(event) => match event.kind {
            // renames report the old and the new path in one event
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any => {
                event
                    .paths
                    .iter()
                    .filter(|path| accept(path))
                    .map(|path| Ok(document_for(path, source)))
                    .collect()
            }
            EventKind::Access(_) | EventKind::Other => Vec::new(),
        },
        Err(err) => vec![Err(SourceError::Watch(err.to_string()))],
    }
}
