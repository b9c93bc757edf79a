
use std::collections::HashSet;
use std::fmt::Write;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::records::CleanRecord;

const ID_PREFIX: &str = "chunk_";
const ID_HASH_BYTES: usize = 8;

/// Metadata stored alongside every chunk and echoed back into the chat context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_url: Option<String>,
    pub tags: Option<String>,
    pub source_title: Option<String>,
    pub author_or_channel: Option<String>,
    /// `YYYY-MM-DD`
    pub published_date: Option<String>,
    pub entities: Option<String>,
}

/// A unit of retrievable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    #[inline]
    pub fn new(text: String, metadata: ChunkMetadata) -> Self {
        Self {
            id: chunk_id(metadata.source_url.as_deref(), &text),
            text,
            metadata,
        }
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&CleanRecord> for ChunkMetadata {
    #[inline]
    fn from(record: &CleanRecord) -> Self {
        Self {
            source_url: record.source_url.clone(),
            tags: record.tags.clone(),
            source_title: record.source_title.clone(),
            author_or_channel: record.author_or_channel.clone(),
            published_date: record.published_day(),
            entities: record.entities.clone(),
        }
    }
}

/// Content-derived id: `chunk_` followed by 16 hex chars of SHA-256 over url, NUL, text
#[inline]
pub fn chunk_id(source_url: Option<&str>, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_url.unwrap_or_default().as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut id = String::with_capacity(ID_PREFIX.len() + ID_HASH_BYTES * 2);
    id.push_str(ID_PREFIX);
    for byte in digest.iter().take(ID_HASH_BYTES) {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}

/// One chunk per record with non-blank text; repeated ids keep their first occurrence
#[inline]
pub fn chunks_from_records(records: &[CleanRecord]) -> Vec<Chunk> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut blank = 0usize;

    let chunks = records
        .iter()
        .filter_map(|record| {
            let text = record
                .chunk_text
                .as_deref()
                .filter(|text| !text.trim().is_empty());
            if text.is_none() {
                blank += 1;
            }
            text.map(|text| Chunk::new(text.to_string(), ChunkMetadata::from(record)))
        })
        .filter(|chunk| seen.insert(chunk.id.clone()))
        .collect::<Vec<_>>();

    debug!(
        "Built {} chunks from {} records ({} without text)",
        chunks.len(),
        records.len(),
        blank
    );
    chunks
}

/// SHA-256 over the ordered chunk ids, texts and metadata, as hex
#[inline]
pub fn corpus_fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(chunk.text.as_bytes());
        hasher.update([0u8]);
        for field in metadata_fields(&chunk.metadata) {
            hasher.update(field.unwrap_or_default().as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

fn metadata_fields(metadata: &ChunkMetadata) -> [Option<&str>; 6] {
    [
        metadata.source_url.as_deref(),
        metadata.tags.as_deref(),
        metadata.source_title.as_deref(),
        metadata.author_or_channel.as_deref(),
        metadata.published_date.as_deref(),
        metadata.entities.as_deref(),
    ]
}
