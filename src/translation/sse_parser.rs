//! Server-Sent Events (SSE) parser for OpenAI-compatible streaming responses.
//!
//! This module provides utilities for parsing SSE streams from chat completion APIs.

use anyhow::Result;
use bytes::Bytes;
use futures_util::Stream;
use serde::Deserialize;
use std::fmt::Display;
use tracing::warn;

/// Response structure for streaming chat completions.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// What a single SSE line means to the text stream.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    /// A non-empty content delta.
    Content(String),
    /// The `data: [DONE]` terminator.
    Done,
    /// Blank lines, comments, other fields and deltas without content.
    Ignored,
    /// A `data:` payload that is not valid chunk JSON.
    Malformed(String),
}

/// Converts a raw SSE byte stream into a stream of text chunks.
///
/// Lines are split on raw bytes so multi-byte characters spanning two
/// network chunks decode intact. Malformed `data:` payloads are logged and
/// skipped; an error from the byte stream is yielded once and ends the
/// stream.
pub fn sse_to_text_stream<E>(
    byte_stream: impl Stream<Item = Result<Bytes, E>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send
where
    E: Display + Send + 'static,
{
    async_stream::stream! {
        use futures_util::StreamExt;

        let mut byte_stream = std::pin::pin!(byte_stream);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {e}"));
                    return;
                }
            };

            buffer.extend_from_slice(&chunk);

            while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=line_end).collect();
                match parse_sse_line(String::from_utf8_lossy(&line).trim()) {
                    SseLine::Content(content) => yield Ok(content),
                    SseLine::Done => return,
                    SseLine::Ignored => {}
                    SseLine::Malformed(payload) => {
                        warn!(payload = %payload, "Skipping malformed stream chunk");
                    }
                }
            }
        }

        // A final event without a trailing newline.
        if let SseLine::Content(content) = parse_sse_line(String::from_utf8_lossy(&buffer).trim()) {
            yield Ok(content);
        }
    }
}

/// Classifies a single trimmed SSE line.
///
/// # Example
///
/// ```ignore
/// let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
/// assert_eq!(parse_sse_line(line), SseLine::Content("Hello".to_string()));
/// ```
fn parse_sse_line(line: &str) -> SseLine {
    let Some(json_str) = line.strip_prefix("data:").map(str::trim_start) else {
        return SseLine::Ignored;
    };

    if json_str == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(response) = serde_json::from_str::<StreamResponse>(json_str) else {
        return SseLine::Malformed(json_str.to_string());
    };

    let content: String = response
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .collect();

    if content.is_empty() {
        SseLine::Ignored
    } else {
        SseLine::Content(content)
    }
}
