//! Mock document source for testing. Serves pre-loaded texts.

use async_trait::async_trait;
use vmq_protocol::{Document, corpus_from_texts};

use crate::error::RetrievalResult;
use crate::source::DocumentSource;

/// A document source that serves an in-memory corpus.
#[derive(Debug, Clone, Default)]
pub struct MockDocumentSource {
    texts: Vec<String>,
}

impl MockDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
        }
    }

    /// The corpus as it would be loaded.
    pub fn documents(&self) -> Vec<Document> {
        corpus_from_texts(self.texts.iter().cloned())
    }

    /// A small corpus about the VM platform.
    pub fn with_platform_sample() -> Self {
        Self::with_texts([
            "VMs are launched from a base QCOW2 image and booted with QEMU. Each VM gets a random SSH port between 49152 and 65535.",
            "To connect to a VM, open an SSH session to localhost on the VM's SSH port. The default user is ubuntu.",
            "Deleting a VM terminates its QEMU process and removes its disk image. This cannot be undone.",
            "Supported instance types are t2.micro, t2.small and t2.medium. The default region is us-east-1.",
        ])
    }
}

#[async_trait]
impl DocumentSource for MockDocumentSource {
    async fn load(&self) -> RetrievalResult<Vec<Document>> {
        Ok(self.documents())
    }

    fn describe(&self) -> String {
        format!("mock ({} documents)", self.texts.len())
    }
}
