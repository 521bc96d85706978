//! Document sources: load the corpus from disk or from memory.

use std::path::PathBuf;

use async_trait::async_trait;
use vmq_protocol::Document;

use crate::error::{RetrievalError, RetrievalResult};

/// Where the corpus comes from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load every document, assigning positions in a stable order.
    async fn load(&self) -> RetrievalResult<Vec<Document>>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Reads `.txt` and `.md` files from a directory (non-recursive).
///
/// Files are sorted by name so corpus positions are stable across runs.
/// Empty files are skipped.
pub struct DirectoryDocumentSource {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryDocumentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extensions: vec!["txt".into(), "md".into()],
        }
    }

    /// Replace the accepted file extensions (without the leading dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    fn accepts(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)))
    }
}

#[async_trait]
impl DocumentSource for DirectoryDocumentSource {
    async fn load(&self) -> RetrievalResult<Vec<Document>> {
        let dir_label = self.dir.display().to_string();
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RetrievalError::NotFound(dir_label.clone())
            } else {
                RetrievalError::Io(format!("{dir_label}: {e}"))
            }
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RetrievalError::Io(format!("{dir_label}: {e}")))?
        {
            let path = entry.path();
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if is_file && self.accepts(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RetrievalError::Io(format!("{}: {e}", path.display())))?;
            let text = text.trim();
            if text.is_empty() {
                tracing::debug!(path = %path.display(), "skipping empty document");
                continue;
            }
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            documents.push(Document::new(documents.len(), text).with_source(source));
        }

        tracing::info!(dir = %dir_label, count = documents.len(), "documents loaded");
        Ok(documents)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }
}
