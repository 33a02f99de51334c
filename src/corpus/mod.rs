//! Background corpus the index is built from.
//!
//! A [`DocumentSource`] is asked once per process for every document about a
//! topic; the result is chunked and embedded by the pipeline and never
//! refreshed afterwards.

mod wikipedia;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::rag::RagError;

pub use wikipedia::WikipediaSource;

/// Raw text of one source page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Where the text came from (page URL for Wikipedia).
    pub source: String,
    pub text: String,
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, topic: &str) -> Result<Vec<Document>, RagError>;
}

/// Fixed in-memory corpus.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: Vec<Document>,
}

impl StaticSource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// One document per text, ids `doc-0`, `doc-1`, ...
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let documents = texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Document {
                id: format!("doc-{}", idx),
                title: format!("Document {}", idx),
                source: "static".to_string(),
                text: text.into(),
            })
            .collect();
        Self { documents }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, _topic: &str) -> Result<Vec<Document>, RagError> {
        Ok(self.documents.clone())
    }
}
