//! Streaming Completion Backend
//!
//! The AI service is an opaque streaming text-completion endpoint behind
//! the `CompletionBackend` trait. The bundled implementation speaks the
//! Anthropic Messages API over server-sent events: text fragments arrive
//! incrementally and a usage summary closes the stream.

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::engine;
use crate::types::{LensError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Callback invoked with each streamed text fragment. Routing the type
/// through an alias keeps the `&str` argument higher-ranked across the
/// `async_trait` desugaring (so the callback forwards to plain helper
/// functions), while the explicit `'a` object-lifetime parameter matches
/// the `&'a dyn Trait` default and lets callers pass borrowing closures.
pub type DeltaCallback<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// One streaming completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Token usage reported by the service at stream end.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Accumulated stream result.
#[derive(Debug)]
pub struct CompletionOutcome {
    pub text: String,
    pub usage: CompletionUsage,
}

/// Streaming text-completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issue one streaming request. Every text fragment is handed to
    /// `on_delta` in arrival order; the accumulated text and usage are
    /// returned once the stream ends.
    async fn stream_completion(
        &self,
        credential: &SecretString,
        request: &CompletionRequest,
        on_delta: &DeltaCallback<'_>,
    ) -> Result<CompletionOutcome>;
}

/// Anthropic Messages API backend.
pub struct AnthropicBackend {
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicBackend {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(LensError::Http)?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }

    pub fn with_defaults(model: impl Into<String>) -> Result<Self> {
        Self::new(DEFAULT_API_BASE, model, engine::REQUEST_TIMEOUT_SECS)
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    async fn stream_completion(
        &self,
        credential: &SecretString,
        request: &CompletionRequest,
        on_delta: &DeltaCallback<'_>,
    ) -> Result<CompletionOutcome> {
        let url = format!("{}/v1/messages", self.api_base);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            system: &request.system_prompt,
            messages: vec![Message {
                role: "user",
                content: &request.user_message,
            }],
            stream: true,
        };

        debug!(model = %self.model, "starting streaming completion");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", credential.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LensError::AiInvalidCredentials,
                429 => LensError::AiRateLimited(body),
                code => LensError::AiService {
                    status: code,
                    message: body,
                },
            });
        }

        let mut state = StreamState::default();
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);

            // SSE events are separated by a blank line.
            while let Some(boundary) = find_event_boundary(&buffer) {
                let block: Vec<u8> = buffer.drain(..boundary + 2).collect();
                let block = String::from_utf8_lossy(&block);
                handle_sse_block(&block, &mut state, on_delta)?;
            }
        }

        debug!(
            input_tokens = state.usage.input_tokens,
            output_tokens = state.usage.output_tokens,
            chars = state.text.len(),
            "completion stream ended"
        );

        Ok(CompletionOutcome {
            text: state.text,
            usage: state.usage,
        })
    }
}

#[derive(Default)]
struct StreamState {
    text: String,
    usage: CompletionUsage,
}

fn find_event_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Process one SSE block, dispatching on the payload's `type` field. The
/// `event:` lines are redundant with it and ignored.
fn handle_sse_block(
    block: &str,
    state: &mut StreamState,
    on_delta: &DeltaCallback<'_>,
) -> Result<()> {
    for line in block.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            continue;
        }

        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "unparseable SSE data line, skipping");
                continue;
            }
        };

        match value.get("type").and_then(Value::as_str) {
            Some("message_start") => {
                if let Some(tokens) = value
                    .pointer("/message/usage/input_tokens")
                    .and_then(Value::as_u64)
                {
                    state.usage.input_tokens = tokens;
                }
            }
            Some("content_block_delta") => {
                if let Some(text) = value.pointer("/delta/text").and_then(Value::as_str) {
                    state.text.push_str(text);
                    on_delta(text);
                }
            }
            Some("message_delta") => {
                if let Some(tokens) = value
                    .pointer("/usage/output_tokens")
                    .and_then(Value::as_u64)
                {
                    state.usage.output_tokens = tokens;
                }
            }
            Some("error") => {
                let message = value
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown stream error")
                    .to_string();
                return Err(LensError::AiService {
                    status: 200,
                    message,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

// Request types

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}
