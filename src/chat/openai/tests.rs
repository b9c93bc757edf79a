use super::*;
use crate::test_support::chat_config_for;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY_ENV: &str = "FIGHTER_RAG_TEST_UNSET_KEY";

#[tokio::test]
async fn complete_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "messages": [
                { "role": "system", "content": "context" },
                { "role": "user", "content": "Who is Rabindra Dhant?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "A Nepalese MMA fighter." } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config_for(&server, KEY_ENV), "test-key")
        .expect("should create client");
    let answer = client
        .complete(&[
            ChatMessage::system("context"),
            ChatMessage::user("Who is Rabindra Dhant?"),
        ])
        .expect("should complete");

    assert_eq!(answer, "A Nepalese MMA fighter.");
}

#[tokio::test]
async fn missing_choice_or_content_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        })))
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config_for(&server, KEY_ENV), "k")
        .expect("should create client");

    assert_eq!(client.complete(&[ChatMessage::user("hi")]).expect("ok"), "");
    assert_eq!(client.complete(&[ChatMessage::user("hi")]).expect("ok"), "");
}

#[tokio::test]
async fn http_errors_propagate_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config_for(&server, KEY_ENV), "k")
        .expect("should create client");
    let result = client.complete(&[ChatMessage::user("hi")]);

    assert!(matches!(result, Err(RagError::Chat(_))));
}

#[tokio::test]
async fn malformed_response_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = ChatClient::with_api_key(&chat_config_for(&server, KEY_ENV), "k")
        .expect("should create client");
    assert!(client.complete(&[ChatMessage::user("hi")]).is_err());
}

#[test]
fn connection_failure_is_network_error() {
    let config = ChatConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        ..ChatConfig::default()
    };
    let client = ChatClient::with_api_key(&config, "k").expect("should create client");
    let result = client.complete(&[ChatMessage::user("hi")]);
    assert!(matches!(result, Err(RagError::Network(_))));
}

#[test]
fn missing_api_key_is_config_error() {
    let config = ChatConfig {
        api_key_env: KEY_ENV.to_string(),
        ..ChatConfig::default()
    };

    assert!(matches!(api_key_from_env(&config), Err(RagError::Config(_))));
    assert!(ChatClient::new(&config).is_err());
    assert!(Transcriber::new(&config).is_err());
}

#[tokio::test]
async fn transcribe_uploads_multipart_wav() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("name=\"model\"\r\n\r\nwhisper-1"))
        .and(body_string_contains("filename=\"question.wav\""))
        .and(body_string_contains("RIFF"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Who is his coach?"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("should create temp dir");
    let wav = dir.path().join("question.wav");
    fs::write(&wav, b"RIFF....WAVEfmt ").expect("should write wav");

    let transcriber = Transcriber::with_api_key(&chat_config_for(&server, KEY_ENV), "test-key")
        .expect("should create transcriber");
    let text = transcriber.transcribe_file(&wav).expect("should transcribe");

    assert_eq!(text, "Who is his coach?");
}

#[test]
fn transcribe_missing_file_is_io_error() {
    let transcriber =
        Transcriber::with_api_key(&ChatConfig::default(), "k").expect("should create transcriber");
    let result = transcriber.transcribe_file("/definitely/not/here.wav");
    assert!(matches!(result, Err(RagError::Io(_))));
}

#[test]
fn multipart_layout() {
    let body = multipart_body("XYZ", "whisper-1", "a.wav", b"abc");
    let text = String::from_utf8(body).expect("ascii body");

    assert!(text.starts_with("--XYZ\r\n"));
    assert!(text.contains("Content-Type: audio/wav\r\n\r\nabc\r\n--XYZ--\r\n"));
    assert_eq!(text.matches("--XYZ\r\n").count(), 2);
}
