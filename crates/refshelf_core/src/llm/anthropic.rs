//! Anthropic Messages API client.
//!
//! # Responsibility
//! - Implement [`TextGenerator`] over blocking HTTP.
//!
//! # Invariants
//! - The API key is sent as a sensitive header and never logged.
//! - Only `text` content blocks contribute to the reply.

use super::{GenerationError, GenerationRequest, GenerationResult, TextGenerator};
use crate::logging::sanitize_message;
use log::{error, info};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Blocking client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: Client,
    endpoint: String,
}

impl AnthropicClient {
    /// Builds a client for `base_url` (defaults to [`DEFAULT_BASE_URL`]).
    pub fn new(api_key: &str, base_url: Option<&str>) -> GenerationResult<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GenerationError::InvalidConfig(
                "api key must not be empty".to_string(),
            ));
        }

        let mut key = HeaderValue::from_str(api_key).map_err(|_| {
            GenerationError::InvalidConfig("api key contains invalid characters".to_string())
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');

        Ok(Self {
            http,
            endpoint: format!("{base}/v1/messages"),
        })
    }
}

impl TextGenerator for AnthropicClient {
    fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let started_at = Instant::now();
        info!(
            "event=generate module=llm status=start model={} max_tokens={} prompt_chars={}",
            request.model,
            request.max_tokens,
            request.prompt.chars().count()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request_body(request))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!(
                "event=generate module=llm status=error duration_ms={} http_status={}",
                started_at.elapsed().as_millis(),
                status.as_u16()
            );
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body_excerpt: sanitize_message(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let parsed: MessagesResponse = response.json()?;
        let text = collect_text(parsed);
        if text.trim().is_empty() {
            error!(
                "event=generate module=llm status=error duration_ms={} error_code=empty_reply",
                started_at.elapsed().as_millis()
            );
            return Err(GenerationError::EmptyResponse);
        }

        info!(
            "event=generate module=llm status=ok duration_ms={} reply_chars={}",
            started_at.elapsed().as_millis(),
            text.chars().count()
        );
        Ok(text)
    }
}

fn request_body(request: &GenerationRequest) -> MessagesRequest<'_> {
    MessagesRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        messages: [UserMessage {
            role: "user",
            content: &request.prompt,
        }],
    }
}

fn collect_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::{collect_text, request_body, AnthropicClient, MessagesResponse};
    use crate::llm::{GenerationError, GenerationRequest};
    use serde_json::json;

    #[test]
    fn request_body_omits_unset_temperature() {
        let request = GenerationRequest {
            model: "model-x".to_string(),
            max_tokens: 500,
            temperature: None,
            prompt: "hello".to_string(),
        };
        let body = serde_json::to_value(request_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "model-x",
                "max_tokens": 500,
                "messages": [{"role": "user", "content": "hello"}]
            })
        );
    }

    #[test]
    fn request_body_includes_zero_temperature() {
        let request = GenerationRequest {
            model: "model-x".to_string(),
            max_tokens: 4000,
            temperature: Some(0.0),
            prompt: "p".to_string(),
        };
        let body = serde_json::to_value(request_body(&request)).unwrap();
        assert_eq!(body["temperature"], json!(0.0));
    }

    #[test]
    fn collect_text_joins_text_blocks_only() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Foo/"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "Bar"}
            ]
        }))
        .unwrap();
        assert_eq!(collect_text(response), "Foo/Bar");
    }

    #[test]
    fn new_rejects_blank_api_key() {
        let err = AnthropicClient::new("  ", None).err().unwrap();
        assert!(matches!(err, GenerationError::InvalidConfig(_)));
    }
}
