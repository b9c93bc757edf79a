// LanceDB vector database module
// Handles vector storage and similarity search for chunk embeddings


pub mod vector_store;

use serde::{Deserialize, Serialize};

use crate::embeddings::chunking::{Chunk, ChunkMetadata};

pub use vector_store::{SearchResult, VectorStore};

/// One row of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Content-derived chunk id, unique within the collection
    pub id: String,
    pub vector: Vec<f32>,
    /// The chunk text
    pub document: String,
    pub metadata: ChunkMetadata,
}

impl VectorRecord {
    #[inline]
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            vector,
            document: chunk.text.clone(),
            metadata: chunk.metadata.clone(),
        }
    }
}
