use super::{blocking_stream, document_for, open_file, watch_path, SearchPattern};
use crate::error::SourceError;
use crate::source::{DocumentReader, DocumentSource, DocumentStream};
use log::warn;
use notify::RecursiveMode;
use std::path::{Path, PathBuf};
use textindex_core::{Document, SourceId};
use walkdir::WalkDir;

/// Every file below a root directory whose name matches a [`SearchPattern`].
#[derive(Debug)]
pub struct DirectoryDocumentSource {
    id: SourceId,
    root: PathBuf,
    pattern: SearchPattern,
}

impl DirectoryDocumentSource {
    pub fn new(root: impl AsRef<Path>, pattern: &str) -> Result<Self, SourceError> {
        let root = root.as_ref();
        let invalid_root = || SourceError::InvalidRoot(root.to_path_buf());
        if !root.is_dir() {
            return Err(invalid_root());
        }
        let root = root.canonicalize().map_err(|_| invalid_root())?;

        Ok(Self {
            id: SourceId::next(),
            root,
            pattern: SearchPattern::new(pattern)?,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn pattern(&self) -> &SearchPattern {
        &self.pattern
    }
}

impl DocumentSource for DirectoryDocumentSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.root.display(), self.pattern)
    }

    fn find_all_documents(&self) -> DocumentStream {
        let root = self.root.clone();
        let pattern = self.pattern.clone();
        let source = self.id;

        blocking_stream(move |tx| {
            for entry in WalkDir::new(&root).follow_links(false) {
                let item = match entry {
                    Ok(entry) if entry.file_type().is_file() && pattern.is_match(entry.file_name()) => {
                        Ok(document_for(entry.path(), source))
                    }
                    Ok(_) => continue,
                    // unreadable subdirectories are skipped, an unreadable root fails the walk
                    Err(err) if err.depth() > 0 => {
                        warn!("skipping {}: {err}", err.path().unwrap_or(root.as_path()).display());
                        continue;
                    }
                    Err(err) => Err(SourceError::Walk(err.to_string())),
                };
                let failed = item.is_err();
                if tx.blocking_send(item).is_err() || failed {
                    return;
                }
            }
        })
    }

    fn watch_for_changes(&self) -> DocumentStream {
        let pattern = self.pattern.clone();
        watch_path(
            self.root.clone(),
            RecursiveMode::Recursive,
            self.id,
            move |path| {
                !path.is_dir() && path.file_name().is_some_and(|name| pattern.is_match(name))
            },
        )
    }

    fn open(&self, document: &Document) -> Result<Option<DocumentReader>, SourceError> {
        self.ensure_own(document)?;
        open_file(Path::new(document.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            DirectoryDocumentSource::new(&missing, "*"),
            Err(SourceError::InvalidRoot(path)) if path == missing
        ));
    }

    #[test]
    fn foreign_documents_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let first = DirectoryDocumentSource::new(dir.path(), "*").unwrap();
        let second = DirectoryDocumentSource::new(dir.path(), "*").unwrap();
        assert_ne!(first.id(), second.id());

        let document = Document::new(dir.path().join("a.txt").to_string_lossy(), second.id());
        assert!(matches!(
            first.open(&document),
            Err(SourceError::ForeignDocument { .. })
        ));
    }
}
