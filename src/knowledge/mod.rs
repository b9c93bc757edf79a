// Knowledge base
// Builds the chunk collection once per corpus fingerprint and answers similarity queries

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::{SearchResult, VectorRecord, VectorStore};
use crate::embeddings::{Chunk, OllamaClient, corpus_fingerprint};
use crate::{RagError, Result};

/// What the last build wrote, used to decide whether the collection is stale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub collection: String,
    pub fingerprint: String,
    pub chunk_count: usize,
    pub model: String,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    /// `None` when no manifest has been written yet or it cannot be parsed
    #[inline]
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        match toml::from_str(&content) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                warn!("Ignoring unreadable index manifest {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RagError::Data(format!("Failed to serialize index manifest: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The stored collection already matches the corpus
    Reused { chunks: usize },
    Rebuilt { chunks: usize },
}

/// Handle over the embedding client and the named collection
pub struct KnowledgeBase {
    store: VectorStore,
    embedder: OllamaClient,
    manifest_path: PathBuf,
    top_k: usize,
    dimension: usize,
}

impl KnowledgeBase {
    #[inline]
    pub async fn open(config: &Config) -> Result<Self> {
        let embedder = OllamaClient::new(&config.embedding)
            .map_err(|e| RagError::Config(format!("{:#}", e)))?;
        let store = VectorStore::new(config).await?;

        Ok(Self::with_parts(
            store,
            embedder,
            config.index_manifest_path(),
            config.data.top_k,
            config.embedding.embedding_dimension as usize,
        ))
    }

    #[inline]
    pub fn with_parts(
        store: VectorStore,
        embedder: OllamaClient,
        manifest_path: PathBuf,
        top_k: usize,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            manifest_path,
            top_k: top_k.max(1),
            dimension,
        }
    }

    #[inline]
    pub fn collection_name(&self) -> &str {
        self.store.table_name()
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Vector length every embedding must have
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn manifest(&self) -> Result<Option<IndexManifest>> {
        IndexManifest::load(&self.manifest_path)
    }

    #[inline]
    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    /// Embed and upsert chunks, skipping blank text and repeated ids.
    /// Returns the number of chunks written.
    #[inline]
    pub async fn build(&mut self, chunks: &[Chunk]) -> Result<usize> {
        let chunks = storable_chunks(chunks);
        if chunks.is_empty() {
            info!("No chunks to index");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;
        for vector in &vectors {
            self.check_dimension(vector)?;
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector))
            .collect();

        let written = self.store.upsert(&records).await?;
        info!(
            "Indexed {} chunks into {}",
            written,
            self.store.table_name()
        );
        Ok(written)
    }

    /// Rebuild only when the corpus fingerprint changed, the stored rows
    /// disagree with the manifest or the corpus ids, or `force` is set
    #[inline]
    pub async fn ensure_indexed(&mut self, chunks: &[Chunk], force: bool) -> Result<IndexOutcome> {
        let storable = storable_chunks(chunks);
        let fingerprint = corpus_fingerprint(&storable);
        let stored = self.store.count().await?;

        if !force {
            if let Some(manifest) = self.manifest()? {
                let current = manifest.fingerprint == fingerprint
                    && manifest.collection == self.store.table_name()
                    && manifest.model == self.embedder.model()
                    && manifest.chunk_count == stored
                    && self.stored_ids_match(&storable).await?;
                if current {
                    info!(
                        "Collection {} is up to date ({} chunks)",
                        self.store.table_name(),
                        stored
                    );
                    return Ok(IndexOutcome::Reused { chunks: stored });
                }
                debug!("Index manifest is stale, rebuilding");
            }
        }

        self.store.drop_collection().await?;
        let written = self.build(&storable).await?;

        IndexManifest {
            collection: self.store.table_name().to_string(),
            fingerprint,
            chunk_count: written,
            model: self.embedder.model().to_string(),
            built_at: Utc::now(),
        }
        .save(&self.manifest_path)?;

        Ok(IndexOutcome::Rebuilt { chunks: written })
    }

    /// Top `top_k` chunks for `query`, most similar first
    #[inline]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.retrieve_top(query, self.top_k).await
    }

    #[inline]
    pub async fn retrieve_top(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if self.store.count().await? == 0 {
            debug!("Collection {} is empty", self.store.table_name());
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(query)
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;
        self.check_dimension(&vector)?;

        let results = self.store.search(&vector, k).await?;
        debug!("Retrieved {} chunks for query", results.len());
        Ok(results)
    }
}

impl KnowledgeBase {
    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(RagError::Embedding(format!(
                "Model {} returned {}-dimensional vectors, expected {}",
                self.embedder.model(),
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    async fn stored_ids_match(&self, chunks: &[Chunk]) -> Result<bool> {
        let stored: HashSet<String> = self.store.list_ids().await?.into_iter().collect();
        let matches = stored.len() == chunks.len()
            && chunks.iter().all(|chunk| stored.contains(&chunk.id));
        if !matches {
            debug!("Stored ids differ from the corpus");
        }
        Ok(matches)
    }
}

fn storable_chunks(chunks: &[Chunk]) -> Vec<Chunk> {
    let mut seen = HashSet::with_capacity(chunks.len());
    chunks
        .iter()
        .filter(|chunk| !chunk.is_blank())
        .filter(|chunk| seen.insert(chunk.id.as_str()))
        .cloned()
        .collect()
}
