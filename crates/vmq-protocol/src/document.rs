use serde::{Deserialize, Serialize};

/// A single corpus entry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Zero-based position in the corpus (load order).
    pub position: usize,
    /// Full document text.
    pub text: String,
    /// Where the text came from (file name), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Build a corpus from plain strings, assigning positions in order.
pub fn corpus_from_texts<I, S>(texts: I) -> Vec<Document>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(i, t)| Document::new(i, t))
        .collect()
}
