use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::Tier;
use crate::normalize::preview;
use crate::prompt::PromptDocument;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("no API credential configured for the {0:?} tier")] MissingCredential(Tier),
    #[error("upstream failure: {0}")] UpstreamFailure(String),
    #[error("upstream returned an empty response")] EmptyResponse,
}

pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// One streaming call, already resolved to a key, model and body.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub api_key: String,
    pub model: String,
    pub body: Value,
}

/// Opens the chunked text stream for a request.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    async fn open(&self, request: &StreamRequest) -> Result<TextStream, GenerationError>;
}

/// Fixed sampling parameters; callers never pick these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl SamplingConfig {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self { temperature: 0.9, top_p: 0.95, top_k: 40, max_output_tokens: 2048 },
            // Premium reports read as analysis, so sample more conservatively.
            Tier::Premium => Self { temperature: 0.6, top_p: 0.9, top_k: 32, max_output_tokens: 8192 },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub free: Option<String>,
    pub premium: Option<String>,
}

impl Credentials {
    pub fn for_tier(&self, tier: Tier) -> Option<&str> {
        let key = match tier {
            Tier::Free => self.free.as_deref(),
            Tier::Premium => self.premium.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }
}

pub struct GeminiClient<S = HttpChunkSource> {
    source: S,
    credentials: Credentials,
    model: String,
}

impl<S: ChunkSource> GeminiClient<S> {
    pub fn new(source: S, credentials: Credentials, model: impl Into<String>) -> Self {
        Self { source, credentials, model: model.into() }
    }

    pub fn build_request_body(tier: Tier, prompt: &PromptDocument, user_input: &str, schema: &Value) -> Value {
        let sampling = SamplingConfig::for_tier(tier);
        json!({
            "systemInstruction": {
                "parts": [{"text": prompt.system_instruction()}]
            },
            "contents": [{
                "role": "user",
                "parts": [{"text": user_input}]
            }],
            "generationConfig": {
                "temperature": sampling.temperature,
                "topP": sampling.top_p,
                "topK": sampling.top_k,
                "maxOutputTokens": sampling.max_output_tokens,
                "candidateCount": 1,
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        })
    }

    /// Streams one generation and returns the concatenated text.
    pub async fn generate(
        &self,
        tier: Tier,
        prompt: &PromptDocument,
        user_input: &str,
        schema: &Value,
    ) -> Result<String, GenerationError> {
        let api_key = self.credentials.for_tier(tier).ok_or_else(|| {
            error!("❌ No Gemini credential configured for {:?} tier", tier);
            GenerationError::MissingCredential(tier)
        })?;

        let request = StreamRequest {
            api_key: api_key.to_string(),
            model: self.model.clone(),
            body: Self::build_request_body(tier, prompt, user_input, schema),
        };

        let mut stream = self.source.open(&request).await?;
        let mut text = String::new();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk?);
            chunks += 1;
        }

        if text.trim().is_empty() {
            warn!("⚠️ Gemini stream finished after {} chunks without any text", chunks);
            return Err(GenerationError::EmptyResponse);
        }
        info!("📥 Received {} chars in {} chunks", text.len(), chunks);
        Ok(text)
    }
}

// --- HTTP transport ---

pub const API_KEY_HEADER: &str = "x-goog-api-key";

fn upstream_failure(e: reqwest::Error) -> GenerationError {
    GenerationError::UpstreamFailure(e.without_url().to_string())
}

pub struct HttpChunkSource {
    client: Client,
    base_url: String,
}

impl HttpChunkSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.into() })
    }
}

#[async_trait]
impl ChunkSource for HttpChunkSource {
    async fn open(&self, request: &StreamRequest) -> Result<TextStream, GenerationError> {
        // Key goes in a header, never in the URL.
        let url = format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, request.model);
        info!("🔗 Making streaming request to: {}", url);
        debug!("📤 Request body: {}", preview(&request.body.to_string()));

        let response = self.client
            .post(&url)
            .header(API_KEY_HEADER, &request.api_key)
            .json(&request.body)
            .send()
            .await
            .map_err(upstream_failure)?;

        let status = response.status();
        info!("📥 Response status: {}", status);
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", preview(&error_body));
            return Err(GenerationError::UpstreamFailure(format!("status={} body={}", status, preview(&error_body))));
        }

        Ok(text_chunks(response.bytes_stream().boxed()))
    }
}

/// Turns raw SSE bytes into one text chunk per network read that carried text.
pub fn text_chunks(bytes: BoxStream<'static, Result<Bytes, reqwest::Error>>) -> TextStream {
    stream::unfold(Some((bytes, SseDecoder::default())), |state| async move {
        let Some((mut bytes, mut decoder)) = state else { return None };
        loop {
            let events = match bytes.next().await {
                Some(Ok(chunk)) => decoder.push(&chunk),
                Some(Err(e)) => {
                    let err = upstream_failure(e);
                    error!("❌ Gemini stream aborted: {}", err);
                    return Some((Err(err), None));
                }
                None => {
                    let rest = decoder.finish();
                    return match texts_from_events(&rest) {
                        Ok(text) if text.is_empty() => None,
                        result => Some((result, None)),
                    };
                }
            };
            match texts_from_events(&events) {
                Ok(text) if text.is_empty() => continue,
                Ok(text) => return Some((Ok(text), Some((bytes, decoder)))),
                Err(e) => return Some((Err(e), None)),
            }
        }
    })
    .boxed()
}

/// Line-buffered decoder for `text/event-stream` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Feeds bytes and returns the `data:` payloads of every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if let Some(data) = data_payload(&line) {
                events.push(data);
            }
        }
        events
    }

    /// Flushes a trailing line that never got its newline.
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.pending);
        data_payload(&line).into_iter().collect()
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    (!data.is_empty()).then(|| data.to_string())
}

fn texts_from_events(events: &[String]) -> Result<String, GenerationError> {
    let mut text = String::new();
    for event in events {
        let parsed: StreamEvent = serde_json::from_str(event)
            .map_err(|e| GenerationError::UpstreamFailure(format!("parse error: {}: {}", e, preview(event))))?;
        if let Some(err) = parsed.error {
            error!("❌ Gemini stream error event: {} {}", err.code, err.message);
            return Err(GenerationError::UpstreamFailure(format!("code={} message={}", err.code, err.message)));
        }
        for candidate in &parsed.candidates {
            if let Some(reason) = candidate.finish_reason.as_deref() {
                if reason != "STOP" {
                    warn!("⚠️ Gemini candidate finished with reason {}", reason);
                }
            }
            for part in &candidate.content.parts {
                if let Some(t) = &part.text {
                    text.push_str(t);
                }
            }
        }
    }
    Ok(text)
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)] content: Content,
    #[serde(default, rename = "finishReason")] finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
struct Part { #[serde(default)] text: Option<String> }

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)] code: i64,
    #[serde(default)] message: String,
}
