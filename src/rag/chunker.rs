//! Fixed-window text chunking.
//!
//! Windows are measured in `char`s, advance by `chunk_size - chunk_overlap`,
//! and the final window always ends at the end of the document, so dropping
//! the trailing `chunk_overlap` characters of every non-final chunk and
//! concatenating gives back the document.

use serde::{Deserialize, Serialize};

use super::error::RagError;
use crate::corpus::Document;

/// A text chunk with source information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `<document_id>:<chunk_index>`, stable across rebuilds.
    pub chunk_id: String,
    pub document_id: String,
    /// Source identifier (URL, filename, etc.)
    pub source: String,
    /// The text content
    pub text: String,
    /// Character offset in original document
    pub start_offset: usize,
    /// Chunk index within the source
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.split_document(doc))
            .collect()
    }

    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start_offset, text))| Chunk {
                chunk_id: format!("{}:{}", document.id, chunk_index),
                document_id: document.id.clone(),
                source: document.source.clone(),
                text,
                start_offset,
                chunk_index,
            })
            .collect()
    }

    /// Split text into overlapping windows, returning `(char_offset, text)`.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut windows = Vec::new();

        if total_chars == 0 {
            return windows;
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(total_chars);
            windows.push((start, chars[start..end].iter().collect()));
            if end == total_chars {
                break;
            }
            start += step;
        }

        windows
    }
}
