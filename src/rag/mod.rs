//! Retrieval-augmented generation over a fixed background corpus.
//!
//! - `Chunker`: splits documents into overlapping windows
//! - `VectorIndex` / `SqliteVectorIndex`: persisted embedding storage
//! - `RagPipeline`: one-time build, then retrieve + generate per question

mod chunker;
mod context;
mod error;
mod pipeline;
mod prompt;
mod sqlite;
mod store;

pub use chunker::{Chunk, Chunker};
pub use context::{context_sources, format_context, CONTEXT_SEPARATOR};
pub use error::RagError;
pub use pipeline::{Answer, BuildFingerprint, BuildReport, PipelineSettings, RagPipeline};
pub use prompt::PromptTemplate;
pub use sqlite::SqliteVectorIndex;
pub use store::{IndexEntry, SearchHit, VectorIndex};
