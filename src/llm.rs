//! Language model client abstraction.
//!
//! A [`LanguageModel`] turns a [`Prompt`] into a [`TextStream`]: a finite,
//! forward-only stream of text chunks that ends when the model signals
//! completion. Errors may surface either when the stream is opened or as an
//! `Err` item mid-stream; the chat pipeline handles both the same way.
//!
//! The only hosted provider is Google Gemini, consumed through the
//! `streamGenerateContent` endpoint in server-sent-events mode.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::prompt::Prompt;

/// Incrementally produced model output.
pub type TextStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash"`).
    fn model_name(&self) -> &str;

    /// Start generating a response to `prompt`.
    async fn stream(&self, prompt: &Prompt) -> Result<TextStream>;
}

/// Create the [`LanguageModel`] named by `[llm].provider`.
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

// ============ Gemini ============

/// Streaming client for the Gemini generative language API.
pub struct GeminiClient {
    model: String,
    base_url: String,
    api_key: String,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client, reading the API key from the environment variable
    /// named by `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("{} environment variable not set", config.api_key_env)
            })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            temperature: config.temperature,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn request_body(&self, prompt: &Prompt) -> serde_json::Value {
        serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": prompt.system_text() }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt.user_input() }]
            }],
            "generationConfig": {
                "temperature": self.temperature
            }
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, prompt: &Prompt) -> Result<TextStream> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(anyhow::Error::from(e).context("Gemini stream interrupted"));
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    match parse_gemini_event(&event) {
                        Ok(Some(text)) => {
                            yield Ok(text);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            if let Some(event) = decoder.finish() {
                match parse_gemini_event(&event) {
                    Ok(Some(text)) => {
                        yield Ok(text);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                    }
                }
            }
        };

        let stream: TextStream = Box::pin(stream);
        Ok(stream)
    }
}

/// Extract the text carried by one Gemini SSE event.
///
/// Returns `Ok(None)` for events without text (e.g. a final event that only
/// carries usage metadata).
fn parse_gemini_event(data: &str) -> Result<Option<String>> {
    let json: serde_json::Value =
        serde_json::from_str(data).context("Invalid Gemini stream event")?;

    if let Some(error) = json.get("error") {
        bail!("Gemini stream error: {}", error);
    }

    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array());

    let text: String = parts
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks are reassembled before decoding.
/// Only `data:` fields are kept; an event is complete at a blank line.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed bytes, returning the data payload of every event they complete.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    events.push(event);
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }

        events
    }

    /// Flush an event left unterminated at end of stream.
    fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            if let Some(value) = line.trim_end_matches('\r').strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }
        self.take_event()
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}
