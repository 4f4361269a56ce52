use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::sse_parser::sse_to_text_stream;
use super::{ChatBackend, ChatRequest, TextStream};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI-compatible streaming chat client.
///
/// No request timeout is set; a stuck stream ends only when the caller
/// cancels it.
#[derive(Debug, Clone, Default)]
pub struct TranslationClient {
    client: Client,
}

impl TranslationClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatBackend for TranslationClient {
    async fn open_stream(&self, request: ChatRequest<'_>) -> Result<TextStream> {
        let url = format!("{}chat/completions", request.base_url);

        let chat_request = ChatCompletionRequest {
            model: request.model,
            messages: [Message {
                role: "user",
                content: request.prompt,
            }],
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(request.api_key)
            .json(&chat_request)
            .send()
            .await
            .with_context(|| format!("Failed to connect to API endpoint: {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API request failed with status {status}: {body}");
        }

        Ok(Box::pin(sse_to_text_stream(response.bytes_stream())))
    }
}
