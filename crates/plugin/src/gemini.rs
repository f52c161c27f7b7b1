use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The client was never usable: it could not be built, or the service
    /// rejected its credentials.
    #[error("client error: {0}")]
    Client(String),
    #[error("{0}")]
    Remote(String),
}

/// A streaming chat model. Chunks are handed to `on_chunk` in the order
/// they arrive.
pub trait ChatBackend {
    fn stream_chat(
        &self,
        system_instruction: &str,
        prompt: &str,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<(), ChatError>;
}

// --- Gemini API request structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

// --- Gemini API response structs ---

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini `streamGenerateContent` client. Owns a current-thread runtime so
/// callers stay synchronous.
pub struct GeminiClient {
    http: reqwest::Client,
    runtime: Runtime,
    key: String,
    model: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(key: &str, config: &ApiConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Client(e.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ChatError::Client(e.to_string()))?;

        Ok(Self {
            http,
            runtime,
            key: key.to_string(),
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    async fn stream(
        &self,
        system_instruction: &str,
        prompt: &str,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<(), ChatError> {
        let request = GeminiRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part { text: system_instruction }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::Remote("Request timed out".into())
                } else {
                    ChatError::Remote(format!("Network error: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let mut decoder = SseDecoder::default();
        let mut bytes = response.bytes_stream();
        while let Some(item) = bytes.next().await {
            let item = item.map_err(|e| ChatError::Remote(format!("Stream error: {e}")))?;
            for text in decoder.push(&item)? {
                on_chunk(&text);
            }
        }
        for text in decoder.finish()? {
            on_chunk(&text);
        }
        Ok(())
    }
}

impl ChatBackend for GeminiClient {
    fn stream_chat(
        &self,
        system_instruction: &str,
        prompt: &str,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<(), ChatError> {
        self.runtime.block_on(self.stream(system_instruction, prompt, on_chunk))
    }
}

fn status_error(code: u16, body: &str) -> ChatError {
    match code {
        401 | 403 => ChatError::Client(format!("API key rejected (HTTP {code})")),
        400 if body.contains("API_KEY_INVALID") => ChatError::Client("API key not valid".into()),
        400 => ChatError::Remote("Bad request. Try a shorter message".into()),
        429 => ChatError::Remote("Rate limited. Try again later".into()),
        500 | 503 => ChatError::Remote("API server error. Try again".into()),
        code => ChatError::Remote(format!("API error (HTTP {code})")),
    }
}

/// Incremental decoder for the `alt=sse` response body.
///
/// Each `data:` line holds one JSON response; its text parts become chunks.
#[derive(Default)]
struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, ChatError> {
        self.pending.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(text) = decode_line(&line)? {
                chunks.push(text);
            }
        }
        Ok(chunks)
    }

    fn finish(&mut self) -> Result<Vec<String>, ChatError> {
        let line = std::mem::take(&mut self.pending);
        Ok(decode_line(&line)?.into_iter().collect())
    }
}

fn decode_line(line: &[u8]) -> Result<Option<String>, ChatError> {
    let line = String::from_utf8_lossy(line);
    let Some(data) = line.trim_end().strip_prefix("data:") else {
        return Ok(None);
    };
    let body: GeminiResponse = serde_json::from_str(data.trim())
        .map_err(|e| ChatError::Remote(format!("Unexpected API response: {e}")))?;

    let text: String = body
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect();
    Ok((!text.is_empty()).then_some(text))
}
