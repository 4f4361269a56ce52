mod client;
pub mod language;
mod prompt;
mod sse_parser;
mod worker;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

pub use client::TranslationClient;
pub use language::{LanguageInfo, SUPPORTED_LANGUAGES, print_languages};
pub use prompt::{CODE_PROMPT, DEFAULT_PROMPT, PromptError, PromptVars, format_prompt};
pub use sse_parser::sse_to_text_stream;
pub use worker::{RequestError, StreamingTranslationWorker, WorkerOutcome, should_emit};

/// Everything one translation attempt needs. Built once per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_language: LanguageInfo,
    pub target_language: LanguageInfo,
    pub prompt_template: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Terminal value of an attempt, delivered once unless it was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranslationResult {
    pub success: bool,
    pub content: String,
    pub error: Option<String>,
    pub from_cache: bool,
}

impl TranslationResult {
    pub fn completed(content: String) -> Self {
        Self {
            success: true,
            content,
            ..Self::default()
        }
    }

    pub fn cached(content: String) -> Self {
        Self {
            success: true,
            content,
            error: None,
            from_cache: true,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Receives partial and final output of a worker.
pub trait TranslationSink: Send + Sync {
    /// The full text accumulated so far (not a delta).
    fn on_progress(&self, partial: &str);
    fn on_complete(&self, result: &TranslationResult);
}

/// One chat-completion call, already resolved to a concrete endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// Base URL ending in `/`.
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
}

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A streaming chat-completion endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Opens the call and returns its content deltas.
    async fn open_stream(&self, request: ChatRequest<'_>) -> Result<TextStream>;
}
