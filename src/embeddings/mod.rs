// Embeddings module
// Turns clean records into chunks and chunks into vectors via Ollama

pub mod chunking;
pub mod ollama;

pub use chunking::{Chunk, ChunkMetadata, chunk_id, chunks_from_records, corpus_fingerprint};
pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};
