use super::*;
use crate::embeddings::ChunkMetadata;
use crate::test_support::{config_for, mount_embedder};
use tempfile::TempDir;
use wiremock::MockServer;

const TEXTS: &[&str] = &[
    "Rabindra Dhant was born in Bajhang District, Nepal",
    "He won the MFN bantamweight championship against Chungreng Koren",
    "Dhant trains at Soma Fight Club in Bali",
    "His professional record stands at nine wins and one loss",
];

fn chunk(text: &str) -> Chunk {
    Chunk::new(
        text.to_string(),
        ChunkMetadata {
            source_url: Some("https://example.com/profile".to_string()),
            tags: Some("bio".to_string()),
            ..ChunkMetadata::default()
        },
    )
}

fn corpus() -> Vec<Chunk> {
    TEXTS.iter().map(|text| chunk(text)).collect()
}

async fn open_kb(server: &MockServer, dir: &TempDir) -> KnowledgeBase {
    let mut config = config_for(server, dir.path());
    config.data.top_k = 2;
    KnowledgeBase::open(&config)
        .await
        .expect("should open knowledge base")
}

async fn embed_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/api/embed")
        .count()
}

#[tokio::test]
async fn build_stores_every_distinct_chunk() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut kb = open_kb(&server, &dir).await;

    let written = kb.build(&corpus()).await.expect("should build");
    assert_eq!(written, TEXTS.len());
    assert_eq!(kb.count().await.expect("should count"), TEXTS.len());
}

#[tokio::test]
async fn build_skips_blank_and_repeated_chunks() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut kb = open_kb(&server, &dir).await;

    let mut chunks = corpus();
    chunks.push(chunk(TEXTS[0]));
    chunks.push(chunk("   "));

    let written = kb.build(&chunks).await.expect("should build");
    assert_eq!(written, TEXTS.len());
}

#[tokio::test]
async fn own_text_is_retrieved_first() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut kb = open_kb(&server, &dir).await;
    kb.build(&corpus()).await.expect("should build");

    for text in TEXTS {
        let results = kb.retrieve(text).await.expect("should retrieve");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document, *text);
        assert!(results[0].similarity_score >= results[1].similarity_score);
    }
}

#[tokio::test]
async fn empty_query_or_collection_returns_nothing() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut kb = open_kb(&server, &dir).await;

    assert!(kb.retrieve("who is he?").await.expect("ok").is_empty());
    assert_eq!(embed_requests(&server).await, 0);

    kb.build(&corpus()).await.expect("should build");
    assert!(kb.retrieve("   ").await.expect("ok").is_empty());
    assert!(kb.retrieve_top("Bali", 0).await.expect("ok").is_empty());
}

#[tokio::test]
async fn ensure_indexed_reuses_unchanged_corpus() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut kb = open_kb(&server, &dir).await;

    let outcome = kb
        .ensure_indexed(&corpus(), false)
        .await
        .expect("should index");
    assert_eq!(
        outcome,
        IndexOutcome::Rebuilt {
            chunks: TEXTS.len()
        }
    );
    let requests_after_build = embed_requests(&server).await;

    let outcome = kb
        .ensure_indexed(&corpus(), false)
        .await
        .expect("should reuse");
    assert_eq!(
        outcome,
        IndexOutcome::Reused {
            chunks: TEXTS.len()
        }
    );
    assert_eq!(embed_requests(&server).await, requests_after_build);

    let manifest = kb
        .manifest()
        .expect("should read manifest")
        .expect("manifest should exist");
    assert_eq!(manifest.chunk_count, TEXTS.len());
    assert_eq!(manifest.collection, "rabindra_info");
    assert_eq!(manifest.model, "all-minilm:latest");
    assert_eq!(manifest.fingerprint, corpus_fingerprint(&corpus()));
}

#[tokio::test]
async fn ensure_indexed_survives_reopen() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");

    {
        let mut kb = open_kb(&server, &dir).await;
        kb.ensure_indexed(&corpus(), false)
            .await
            .expect("should index");
    }

    let mut kb = open_kb(&server, &dir).await;
    let outcome = kb
        .ensure_indexed(&corpus(), false)
        .await
        .expect("should reuse");
    assert!(matches!(outcome, IndexOutcome::Reused { .. }));
}

#[tokio::test]
async fn changed_corpus_rebuilds_without_stale_rows() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut kb = open_kb(&server, &dir).await;

    kb.ensure_indexed(&corpus(), false)
        .await
        .expect("should index");

    let smaller: Vec<Chunk> = corpus().into_iter().take(2).collect();
    let outcome = kb
        .ensure_indexed(&smaller, false)
        .await
        .expect("should rebuild");

    assert_eq!(outcome, IndexOutcome::Rebuilt { chunks: 2 });
    assert_eq!(kb.count().await.expect("should count"), 2);
}

#[tokio::test]
async fn force_always_rebuilds() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut kb = open_kb(&server, &dir).await;

    kb.ensure_indexed(&corpus(), false)
        .await
        .expect("should index");
    let outcome = kb
        .ensure_indexed(&corpus(), true)
        .await
        .expect("should rebuild");

    assert_eq!(
        outcome,
        IndexOutcome::Rebuilt {
            chunks: TEXTS.len()
        }
    );
    assert_eq!(kb.count().await.expect("should count"), TEXTS.len());
}

#[tokio::test]
async fn wrong_vector_length_fails_build() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut config = config_for(&server, dir.path());
    config.embedding.embedding_dimension = 384;
    let mut kb = KnowledgeBase::open(&config)
        .await
        .expect("should open knowledge base");
    assert_eq!(kb.dimension(), 384);

    let err = kb.build(&corpus()).await.expect_err("dimension should not match");
    assert!(matches!(err, RagError::Embedding(_)));
    assert_eq!(kb.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn same_size_corpus_with_other_ids_rebuilds() {
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    let dir = TempDir::new().expect("should create temp dir");
    let mut kb = open_kb(&server, &dir).await;

    kb.build(&corpus()).await.expect("should build");

    let renamed: Vec<Chunk> = TEXTS
        .iter()
        .map(|text| chunk(&format!("{} (updated)", text)))
        .collect();
    IndexManifest {
        collection: kb.collection_name().to_string(),
        fingerprint: corpus_fingerprint(&renamed),
        chunk_count: TEXTS.len(),
        model: "all-minilm:latest".to_string(),
        built_at: Utc::now(),
    }
    .save(&kb.manifest_path)
    .expect("should save manifest");

    let outcome = kb
        .ensure_indexed(&renamed, false)
        .await
        .expect("should rebuild");
    assert_eq!(
        outcome,
        IndexOutcome::Rebuilt {
            chunks: TEXTS.len()
        }
    );

    let mut ids = kb.store.list_ids().await.expect("should list ids");
    ids.sort();
    let mut expected: Vec<String> = renamed.iter().map(|chunk| chunk.id.clone()).collect();
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn manifest_round_trip_and_garbage() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("nested").join("rabindra_info.manifest.toml");

    assert_eq!(IndexManifest::load(&path).expect("ok"), None);

    let manifest = IndexManifest {
        collection: "rabindra_info".to_string(),
        fingerprint: "abc123".to_string(),
        chunk_count: 7,
        model: "all-minilm:latest".to_string(),
        built_at: Utc::now(),
    };
    manifest.save(&path).expect("should save");
    assert_eq!(
        IndexManifest::load(&path).expect("should load"),
        Some(manifest)
    );

    fs::write(&path, "not = [valid").expect("should write");
    assert_eq!(IndexManifest::load(&path).expect("ok"), None);
}
