use anyhow::Result;
use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::prompt::{PromptVars, format_prompt};
use super::{ChatBackend, ChatRequest, TranslationRequest, TranslationResult, TranslationSink};
use crate::cache::{Lookup, TranslationCache};

/// A request field that must be set before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("API key is not set. Configure api_key or api_key_env for the provider")]
    MissingApiKey,
    #[error("API base URL is not set. Configure base_url for the provider")]
    MissingBaseUrl,
    #[error("Model is not set")]
    MissingModel,
    #[error("Prompt template is empty")]
    MissingPrompt,
}

/// How a worker run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// A result was delivered to the sink.
    Completed(TranslationResult),
    /// Cancelled; nothing was delivered or cached after the cancel.
    Cancelled,
}

/// Whether the `chunk_number`-th delta (1-based) triggers a progress update.
///
/// The first three always do, then every third.
pub const fn should_emit(chunk_number: usize) -> bool {
    chunk_number <= 3 || chunk_number % 3 == 0
}

/// Runs a single translation attempt.
///
/// The worker is consumed by [`run`](Self::run). Cancellation is cooperative:
/// the token is checked before each step and raced against every await on the
/// network, so a cancelled worker exits at its next suspension point.
pub struct StreamingTranslationWorker {
    request: TranslationRequest,
    cache: Option<Arc<TranslationCache>>,
    backend: Arc<dyn ChatBackend>,
    token: CancellationToken,
}

impl StreamingTranslationWorker {
    pub fn new(
        request: TranslationRequest,
        cache: Option<Arc<TranslationCache>>,
        backend: Arc<dyn ChatBackend>,
        token: CancellationToken,
    ) -> Self {
        Self {
            request,
            cache,
            backend,
            token,
        }
    }

    pub async fn run(self, sink: &dyn TranslationSink) -> WorkerOutcome {
        if self.token.is_cancelled() {
            debug!("Translation cancelled before start");
            return WorkerOutcome::Cancelled;
        }

        if let Some(cache) = &self.cache {
            match cache.get(&self.request.text, cache.options().min_gap) {
                Lookup::Hit(cached) => {
                    debug!(chars = cached.chars().count(), "Translation served from cache");
                    sink.on_progress(&cached);
                    let result = TranslationResult::cached(cached);
                    sink.on_complete(&result);
                    return WorkerOutcome::Completed(result);
                }
                Lookup::Debounced => debug!("Cache entry too fresh, requesting again"),
                Lookup::Miss => {}
            }
        }

        match self.stream(sink).await {
            Ok(Some(content)) => {
                info!(chars = content.chars().count(), "Translation completed");
                if let Some(cache) = &self.cache
                    && !content.is_empty()
                {
                    cache.set(&self.request.text, &content);
                }
                let result = TranslationResult::completed(content);
                sink.on_complete(&result);
                WorkerOutcome::Completed(result)
            }
            Ok(None) => {
                debug!("Translation cancelled");
                WorkerOutcome::Cancelled
            }
            Err(_) if self.token.is_cancelled() => {
                debug!("Translation cancelled while failing");
                WorkerOutcome::Cancelled
            }
            Err(e) => {
                warn!("Translation failed: {e:#}");
                let result = TranslationResult::failed(format!("{e:#}"));
                sink.on_complete(&result);
                WorkerOutcome::Completed(result)
            }
        }
    }

    /// Streams the model output; `Ok(None)` means cancelled.
    async fn stream(&self, sink: &dyn TranslationSink) -> Result<Option<String>> {
        validate(&self.request)?;

        let base_url = normalize_base_url(&self.request.base_url);
        let prompt = format_prompt(
            &self.request.prompt_template,
            &PromptVars {
                text: &self.request.text,
                source_language: self.request.source_language,
                target_language: self.request.target_language,
            },
        )?;

        let chat = ChatRequest {
            base_url: &base_url,
            api_key: &self.request.api_key,
            model: &self.request.model,
            prompt: &prompt,
        };

        let mut deltas = tokio::select! {
            biased;
            () = self.token.cancelled() => return Ok(None),
            opened = self.backend.open_stream(chat) => opened?,
        };

        let mut buffer = String::new();
        let mut chunks = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                () = self.token.cancelled() => return Ok(None),
                next = deltas.next() => next,
            };
            let Some(delta) = next else { break };
            let delta = delta?;

            if self.token.is_cancelled() {
                return Ok(None);
            }

            chunks += 1;
            buffer.push_str(&delta);
            if should_emit(chunks) {
                sink.on_progress(&buffer);
            }
        }

        if self.token.is_cancelled() {
            return Ok(None);
        }

        debug!(chunks, "Stream finished");
        sink.on_progress(&buffer);
        Ok(Some(buffer))
    }
}

fn validate(request: &TranslationRequest) -> Result<(), RequestError> {
    if request.api_key.trim().is_empty() {
        return Err(RequestError::MissingApiKey);
    }
    if request.base_url.trim().is_empty() {
        return Err(RequestError::MissingBaseUrl);
    }
    if request.model.trim().is_empty() {
        return Err(RequestError::MissingModel);
    }
    if request.prompt_template.trim().is_empty() {
        return Err(RequestError::MissingPrompt);
    }
    Ok(())
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
