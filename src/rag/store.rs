//! VectorIndex trait, the abstract interface for embedding storage.
//!
//! The persisted implementation is `SqliteVectorIndex` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::chunker::Chunk;
use super::error::RagError;

/// A stored chunk, addressed by collection + chunk id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source identifier (URL, filename, etc.).
    pub source: String,
    /// Optional metadata (JSON).
    pub metadata: Option<serde_json::Value>,
}

impl From<&Chunk> for IndexEntry {
    fn from(chunk: &Chunk) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            content: chunk.text.clone(),
            source: chunk.source.clone(),
            metadata: Some(serde_json::json!({
                "document_id": chunk.document_id,
                "chunk_index": chunk.chunk_index,
                "start_offset": chunk.start_offset,
            })),
        }
    }
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub entry: IndexEntry,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert entries with their embeddings. Re-inserting a chunk id replaces it.
    async fn insert_batch(
        &self,
        collection: &str,
        items: Vec<(IndexEntry, Vec<f32>)>,
    ) -> Result<(), RagError>;

    /// Most similar entries first, at most `limit` of them.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, RagError>;

    async fn count(&self, collection: &str) -> Result<usize, RagError>;

    /// Drop every entry of the collection, returning how many were removed.
    async fn clear(&self, collection: &str) -> Result<usize, RagError>;

    /// A recorded per-collection value such as the embedding model.
    async fn metadata(&self, collection: &str, key: &str) -> Result<Option<String>, RagError>;

    async fn set_metadata(&self, collection: &str, key: &str, value: &str) -> Result<(), RagError>;
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_handles_identical_orthogonal_and_mismatched() {
        assert!(approx_eq(cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0));
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
