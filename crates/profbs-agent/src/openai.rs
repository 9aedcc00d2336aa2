use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError, Role};

/// Longest slice of a raw response body carried inside an error.
const BODY_FRAGMENT_CHARS: usize = 500;

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Build a provider whose requests give up after `timeout`.
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com".to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!(model = %req.model, turns = req.messages.len(), "sending request to OpenAI");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await?;
        debug!(status, body = %text, "OpenAI response");

        parse_response_body(status, &text)
    }
}

fn build_request_body(req: &ChatRequest) -> serde_json::Value {
    // System instruction goes first, then the transcript in order.
    let mut messages = vec![serde_json::json!({
        "role": Role::System,
        "content": req.system,
    })];

    for m in &req.messages {
        messages.push(serde_json::json!({
            "role": m.role,
            "content": m.content,
        }));
    }

    serde_json::json!({
        "model": req.model,
        "messages": messages,
        "max_tokens": req.max_tokens,
    })
}

fn parse_response_body(status: u16, text: &str) -> Result<ChatResponse, ProviderError> {
    if !(200..300).contains(&status) {
        warn!(status, "OpenAI API error");
        return Err(ProviderError::Api {
            status,
            message: body_fragment(text),
        });
    }

    let resp: ApiResponse =
        serde_json::from_str(text).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = resp.choices.and_then(|c| c.into_iter().next());
    let stop_reason = choice
        .as_ref()
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_default();
    let content = choice
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| ProviderError::MissingChoice {
            body: body_fragment(text),
        })?;

    Ok(ChatResponse {
        content,
        model: resp.model.unwrap_or_default(),
        tokens_in: resp.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
        tokens_out: resp
            .usage
            .as_ref()
            .map(|u| u.completion_tokens)
            .unwrap_or(0),
        stop_reason,
    })
}

/// First `BODY_FRAGMENT_CHARS` characters of a response body.
fn body_fragment(text: &str) -> String {
    let mut chars = text.chars();
    let mut fragment: String = chars.by_ref().take(BODY_FRAGMENT_CHARS).collect();
    if chars.next().is_some() {
        fragment.push('…');
    }
    fragment
}

// OpenAI API response types (private, deserialization only).
// Every field is optional so a shape mismatch surfaces as MissingChoice.

#[derive(Deserialize)]
struct ApiResponse {
    model: Option<String>,
    choices: Option<Vec<Choice>>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
