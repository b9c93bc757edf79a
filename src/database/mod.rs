// Database module
// LanceDB holds the chunk vectors; the index manifest lives with the knowledge base

pub mod lancedb;

pub use self::lancedb::{SearchResult, VectorRecord, VectorStore};
