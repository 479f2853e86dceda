//! Client for OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::{Result, SkaldError};
use crate::types::Usage;

use super::http::{bearer_headers, parse_sse_data, shared_client, status_to_error};
use super::{Completion, ModelClient, ModelStream, StreamEnd};

/// [`ModelClient`] speaking the `/chat/completions` dialect.
pub struct OpenAiCompatClient {
    model: String,
    api_key: String,
    base_url: String,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

impl OpenAiCompatClient {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            base_url: config.endpoint.clone(),
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
        }
    }

    fn build_body(&self, prompt: &str, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": stream,
        });
        let obj = body.as_object_mut().expect("body is an object");
        if let Some(max) = self.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = self.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        body
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Completion> {
        debug!(model = %self.model, "chat completion request");

        let resp = shared_client()
            .post(self.completions_url())
            .headers(bearer_headers(&self.api_key))
            .json(&self.build_body(prompt, false))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: ChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SkaldError::api(200, "No choices in model response"))?;

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            usage: data.usage.map(Usage::from).unwrap_or_default(),
        })
    }

    async fn open_stream(&self, prompt: &str) -> Result<Box<dyn ModelStream>> {
        debug!(model = %self.model, "chat completion stream request");

        let resp = shared_client()
            .post(self.completions_url())
            .headers(bearer_headers(&self.api_key))
            .json(&self.build_body(prompt, true))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let deltas = async_stream::stream! {
            let mut buffer = String::new();
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(SkaldError::Network(e));
                        break;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(data) = parse_sse_data(&line) {
                        match serde_json::from_str::<StreamChunk>(data) {
                            Ok(chunk) => {
                                let text = chunk
                                    .choices
                                    .into_iter()
                                    .next()
                                    .and_then(|c| c.delta.content)
                                    .unwrap_or_default();
                                yield Ok(SseDelta {
                                    text,
                                    usage: chunk.usage.map(Usage::from),
                                });
                            }
                            Err(_) => {} // skip unparseable chunks
                        }
                    }
                }
            }
        };

        Ok(Box::new(SseStream {
            deltas: Box::pin(deltas),
            usage: None,
        }))
    }
}

struct SseDelta {
    text: String,
    usage: Option<Usage>,
}

struct SseStream {
    deltas: BoxStream<'static, Result<SseDelta>>,
    usage: Option<Usage>,
}

#[async_trait]
impl ModelStream for SseStream {
    async fn next_chunk(&mut self) -> Option<Result<String>> {
        loop {
            match self.deltas.next().await? {
                Ok(delta) => {
                    if let Some(usage) = delta.usage {
                        self.usage = Some(usage);
                    }
                    if delta.text.is_empty() {
                        continue;
                    }
                    return Some(Ok(delta.text));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn finalize(self: Box<Self>) -> Result<StreamEnd> {
        // The chat-completions dialect never restates the full text.
        Ok(StreamEnd {
            final_text: None,
            usage: self.usage.unwrap_or_default(),
        })
    }
}

// Wire types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<WireUsage> for Usage {
    fn from(u: WireUsage) -> Self {
        Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}
