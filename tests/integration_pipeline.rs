#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use std::io::Cursor;

use fighter_rag::chat::{Assistant, ChatClient};
use fighter_rag::config::Config;
use fighter_rag::embeddings::chunks_from_records;
use fighter_rag::knowledge::{IndexOutcome, KnowledgeBase};
use fighter_rag::records::{filter_focus_fights, prepare_dataset, read_table, summarize};
use fighter_rag::shell::{ChatSession, SubmitOutcome};
use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const SOURCE: &str = r#"chunk_text,source_url,tags,source_title,author_or_channel,entities,fighter_a,fighter_b,outcome,method,stats_json,extras_json,published_date,accessed_date
Rabindra Dhant stopped Chungreng Koren to win the MFN title,https://example.com/mfn,fight,MFN 2024 results,Sherdog,Chungreng Koren,Rabindra Dhant,Chungreng Koren,Win,TKO,"{""fighter_a_record_at_fight"": ""8-1""}","{""fighter_a_age_at_fight_years"": 23}",2024-03-02,2025-08-02
Dhant trains at Soma Fight Club in Bali,https://example.com/gym,bio,Training camp,YouTube,Soma Fight Club,,,,,,,2024-05-10,2025-08-02
Kazakh prospect Aibek Nurlan edged Rabindra Dhant on the cards,https://example.com/loss,fight,Bantamweight prelims,Tapology,,Aibek Nurlan,Rabindra Dhant,Win,Decision,{},{},2023-07-15,2025-08-02
Dhant was born in the Bajhang District of Nepal,https://example.com/bio,bio,Profile,Wikipedia,Nepal,,,,,,,2022-01-01,2025-08-02
Dhant trains at Soma Fight Club in Bali,https://example.com/gym,bio,Training camp,YouTube,Soma Fight Club,,,,,,,2024-05-10,2025-08-02
Orphaned fragment,,,,,,,,,,,,,
"#;

const DIMENSION: usize = 64;

/// Character histogram embedding so a text is most similar to itself
struct HistogramEmbedder;

impl HistogramEmbedder {
    fn embed(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIMENSION];
        for c in text.chars().flat_map(char::to_lowercase) {
            let slot = match c {
                'a'..='z' => c as usize - 'a' as usize,
                '0'..='9' => 26 + (c as usize - '0' as usize),
                _ => 36,
            };
            vector[slot] += 1.0;
        }
        vector[DIMENSION - 1] = 1.0;
        vector
    }
}

impl Respond for HistogramEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|input| Self::embed(input.as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();

        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

async fn start_services() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(HistogramEmbedder)
        .mount(&server)
        .await;
    server
}

fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let url = Url::parse(&server.uri()).expect("mock server uri should parse");
    let mut config = Config::with_base_dir(dir.path());
    config.embedding.protocol = url.scheme().to_string();
    config.embedding.host = url.host_str().unwrap_or("127.0.0.1").to_string();
    config.embedding.port = url.port().unwrap_or(80);
    config.embedding.batch_size = 3;
    config.embedding.embedding_dimension = DIMENSION as u32;
    config.chat.base_url = format!("{}/v1", server.uri());
    config.data.top_k = 2;
    config.data.prune_threshold = Some(50.0);
    config
}

#[test]
fn source_is_deduplicated_pruned_and_summarized() {
    let table = read_table(Cursor::new(SOURCE)).expect("should read source");
    assert_eq!(table.shape(), (6, 14));

    let dataset = prepare_dataset(table, Some(50.0));
    assert_eq!(dataset.duplicates_removed, 1);
    let report = dataset.prune_report.as_ref().expect("pruning was requested");
    assert_eq!(report.dropped_rows, vec![4]);
    assert_eq!(dataset.records.len(), 4);

    let title_fight = &dataset.records[0];
    assert_eq!(title_fight.fighter_a_record_at_fight.as_deref(), Some("8-1"));
    assert_eq!(title_fight.fighter_a_age, Some(23.0));
    assert_eq!(title_fight.published_day().as_deref(), Some("2024-03-02"));

    let fights = filter_focus_fights(&dataset.records, "Rabindra Dhant");
    let summary = summarize(&fights, "Rabindra Dhant");
    assert_eq!(summary.fight_count, 2);
    assert_eq!(
        summary.outcomes,
        vec![("Win".to_string(), 1), ("Loss".to_string(), 1)]
    );
    assert_eq!(summary.win_methods, vec![("TKO".to_string(), 1)]);
}

#[tokio::test]
async fn index_once_then_retrieve_own_text() {
    let server = start_services().await;
    let dir = TempDir::new().expect("should create temp dir");
    let config = config_for(&server, &dir);

    let table = read_table(Cursor::new(SOURCE)).expect("should read source");
    let dataset = prepare_dataset(table, config.data.prune_threshold);
    let chunks = chunks_from_records(&dataset.records);
    assert_eq!(chunks.len(), 4);

    let mut knowledge = KnowledgeBase::open(&config)
        .await
        .expect("should open knowledge base");
    assert_eq!(
        knowledge
            .ensure_indexed(&chunks, false)
            .await
            .expect("should build"),
        IndexOutcome::Rebuilt { chunks: 4 }
    );
    assert_eq!(
        knowledge
            .ensure_indexed(&chunks, false)
            .await
            .expect("should reuse"),
        IndexOutcome::Reused { chunks: 4 }
    );

    for chunk in &chunks {
        let results = knowledge
            .retrieve(&chunk.text)
            .await
            .expect("should retrieve");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, chunk.id);
        assert_eq!(results[0].metadata.source_url, chunk.metadata.source_url);
    }
}

#[tokio::test]
async fn chat_session_answers_from_the_collection() {
    let server = start_services().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Soma Fight Club"))
        .and(body_string_contains("Source Title: Training camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "He trains at Soma Fight Club in Bali." } }]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("should create temp dir");
    let config = config_for(&server, &dir);

    let table = read_table(Cursor::new(SOURCE)).expect("should read source");
    let chunks = chunks_from_records(&prepare_dataset(table, None).records);
    let mut knowledge = KnowledgeBase::open(&config)
        .await
        .expect("should open knowledge base");
    knowledge
        .ensure_indexed(&chunks, false)
        .await
        .expect("should build");

    let client = ChatClient::with_api_key(&config.chat, "test-key").expect("should create client");
    let assistant = Assistant::new(knowledge, client);
    let mut session = ChatSession::new();

    assert_eq!(
        session
            .submit("  ", &assistant)
            .await
            .expect("blank input is fine"),
        SubmitOutcome::Ignored
    );

    let outcome = session
        .submit("Dhant trains at Soma Fight Club in Bali", &assistant)
        .await
        .expect("should answer");
    assert_eq!(
        outcome,
        SubmitOutcome::Answered("He trains at Soma Fight Club in Bali.".to_string())
    );
    assert_eq!(session.history().len(), 1);

    session.clear();
    assert!(session.history().is_empty());
}
