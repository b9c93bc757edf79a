#[cfg(test)]
mod tests;

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::prompt::ChatMessage;
use crate::config::ChatConfig;
use crate::{RagError, Result};

const COMPLETIONS_PATH: &str = "chat/completions";
const TRANSCRIPTIONS_PATH: &str = "audio/transcriptions";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Read the API key from the environment variable named in the config
#[inline]
pub fn api_key_from_env(config: &ChatConfig) -> Result<String> {
    env::var(&config.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            RagError::Config(format!(
                "Environment variable {} is not set; it must hold the chat API key",
                config.api_key_env
            ))
        })
}

/// Blocking client for an OpenAI-compatible chat completion endpoint.
/// Makes exactly one request per call with no retry and no timeout.
#[derive(Debug, Clone)]
pub struct ChatClient {
    endpoint: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

impl ChatClient {
    #[inline]
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = api_key_from_env(config)?;
        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key<S: Into<String>>(config: &ChatConfig, api_key: S) -> Result<Self> {
        let endpoint = config
            .endpoint(COMPLETIONS_PATH)
            .map_err(|e| RagError::Config(e.to_string()))?;

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key: api_key.into(),
            agent: ureq::Agent::config_builder().build().into(),
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Content of the first choice, or an empty string when there is none
    #[inline]
    pub fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| RagError::Chat(format!("Failed to serialize chat request: {}", e)))?;

        debug!(
            "Sending {} messages to {} (model {})",
            messages.len(),
            self.endpoint,
            self.model
        );

        let response_text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("Chat completion", &e))?;

        let response: CompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Chat(format!("Failed to parse chat response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        if answer.is_empty() {
            warn!("Chat completion returned no content");
        }
        Ok(answer)
    }
}

/// Speech-to-text through an OpenAI-compatible transcription endpoint
#[derive(Debug, Clone)]
pub struct Transcriber {
    endpoint: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

impl Transcriber {
    #[inline]
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = api_key_from_env(config)?;
        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key<S: Into<String>>(config: &ChatConfig, api_key: S) -> Result<Self> {
        let endpoint = config
            .endpoint(TRANSCRIPTIONS_PATH)
            .map_err(|e| RagError::Config(e.to_string()))?;

        Ok(Self {
            endpoint,
            model: config.transcription_model.clone(),
            api_key: api_key.into(),
            agent: ureq::Agent::config_builder().build().into(),
        })
    }

    /// Upload a WAV file and return the transcribed text
    #[inline]
    pub fn transcribe_file<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();
        let audio = fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "audio.wav".to_string(), |n| n.to_string_lossy().into_owned());

        let boundary = format!("fighter-rag-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_body(&boundary, &self.model, &file_name, &audio);

        debug!(
            "Transcribing {} ({} bytes) with {}",
            path.display(),
            audio.len(),
            self.model
        );

        let response_text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send(body.as_slice())
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("Transcription", &e))?;

        let response: TranscriptionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Chat(format!("Failed to parse transcription response: {}", e)))?;

        Ok(response.text)
    }
}

fn multipart_body(boundary: &str, model: &str, file_name: &str, audio: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(audio.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"model\"\r\n\r\n{model}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: audio/wav\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(audio);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn request_error(what: &str, error: &ureq::Error) -> RagError {
    match error {
        ureq::Error::StatusCode(status) => {
            RagError::Chat(format!("{} request failed: HTTP {}", what, status))
        }
        other => RagError::Network(format!("{} request failed: {}", what, other)),
    }
}
