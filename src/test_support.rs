// Shared fixtures for unit tests that talk to mocked HTTP services

use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::config::{ChatConfig, Config, OllamaConfig};

pub(crate) const TEST_DIMENSION: usize = 64;

/// Deterministic embedding: character histogram plus a constant bias slot
pub(crate) fn histogram_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; TEST_DIMENSION];
    for c in text.chars().flat_map(char::to_lowercase) {
        let slot = match c {
            'a'..='z' => c as usize - 'a' as usize,
            '0'..='9' => 26 + (c as usize - '0' as usize),
            ' ' => 36,
            _ => 37,
        };
        vector[slot] += 1.0;
    }
    vector[TEST_DIMENSION - 1] = 1.0;
    vector
}

/// Answers `/api/embed` with one histogram embedding per input
pub(crate) struct HistogramEmbedder;

impl Respond for HistogramEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let embeddings = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|input| histogram_embedding(input.as_str().unwrap_or_default()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

pub(crate) async fn mount_embedder(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(HistogramEmbedder)
        .mount(server)
        .await;
}

pub(crate) fn ollama_config_for(server: &MockServer) -> OllamaConfig {
    let url = Url::parse(&server.uri()).expect("mock server uri should parse");
    OllamaConfig {
        protocol: url.scheme().to_string(),
        host: url.host_str().unwrap_or("127.0.0.1").to_string(),
        port: url.port().unwrap_or(80),
        batch_size: 2,
        embedding_dimension: TEST_DIMENSION as u32,
        ..OllamaConfig::default()
    }
}

pub(crate) fn chat_config_for(server: &MockServer, api_key_env: &str) -> ChatConfig {
    ChatConfig {
        base_url: format!("{}/v1", server.uri()),
        api_key_env: api_key_env.to_string(),
        ..ChatConfig::default()
    }
}

/// Config rooted in `base_dir` with the embedding section pointed at `server`
pub(crate) fn config_for(server: &MockServer, base_dir: &std::path::Path) -> Config {
    let mut config = Config::with_base_dir(base_dir);
    config.embedding = ollama_config_for(server);
    config
}
