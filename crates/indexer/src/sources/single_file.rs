use super::{document_for, open_file, watch_path};
use crate::error::SourceError;
use crate::source::{DocumentReader, DocumentSource, DocumentStream};
use futures::stream::{self, StreamExt};
use notify::RecursiveMode;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use textindex_core::{Document, SourceId};

/// Exactly one file, which may or may not exist yet.
#[derive(Debug)]
pub struct SingleFileDocumentSource {
    id: SourceId,
    path: PathBuf,
    document: Document,
}

impl SingleFileDocumentSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        // resolve through the parent so that a file created later keeps the same id
        let path = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map_or_else(|_| path.to_path_buf(), |parent| parent.join(name)),
            _ => path.to_path_buf(),
        };
        let id = SourceId::next();
        Self {
            id,
            document: document_for(&path, id),
            path,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl DocumentSource for SingleFileDocumentSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn find_all_documents(&self) -> DocumentStream {
        let directory = self.directory();
        let item = if !directory.is_dir() {
            Some(Err(SourceError::InvalidRoot(directory)))
        } else if self.path.is_file() {
            Some(Ok(self.document.clone()))
        } else {
            None
        };
        stream::iter(item).boxed()
    }

    fn watch_for_changes(&self) -> DocumentStream {
        let file_name: Option<OsString> = self.path.file_name().map(OsString::from);
        let document = self.document.clone();
        watch_path(
            self.directory(),
            RecursiveMode::NonRecursive,
            self.id,
            move |path| file_name.is_some() && path.file_name() == file_name.as_deref(),
        )
        .map(move |item| item.map(|_| document.clone()))
        .boxed()
    }

    fn open(&self, document: &Document) -> Result<Option<DocumentReader>, SourceError> {
        self.ensure_own(document)?;
        if *document != self.document {
            return Err(SourceError::ForeignDocument {
                id: document.id().to_string(),
                owner: document.source(),
                requested: self.id,
            });
        }
        open_file(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::fs;

    #[tokio::test]
    async fn discovery_depends_on_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");

        let source = SingleFileDocumentSource::new(&file);
        let found: Vec<Document> = source.find_all_documents().try_collect().await.unwrap();
        assert!(found.is_empty());

        fs::write(&file, "hello").unwrap();
        let found: Vec<Document> = source.find_all_documents().try_collect().await.unwrap();
        assert_eq!(found, vec![source.document().clone()]);

        let orphan = SingleFileDocumentSource::new(dir.path().join("gone").join("notes.txt"));
        let err = orphan
            .find_all_documents()
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidRoot(_)));
    }

    #[test]
    fn open_only_accepts_its_own_document() {
        let dir = tempfile::tempdir().unwrap();
        let source = SingleFileDocumentSource::new(dir.path().join("a.txt"));
        let other = Document::new("elsewhere.txt", source.id());
        assert!(matches!(
            source.open(&other),
            Err(SourceError::ForeignDocument { .. })
        ));
        assert!(source.open(source.document()).unwrap().is_none());
    }
}
