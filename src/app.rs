//! Wires detector events to translations.
//!
//! The app owns the source buffer that Append events grow and the next
//! Translate event consumes, turns the final text into a
//! [`TranslationRequest`], and hands it to the [`TranslationService`].
//! Successful results are added to the [`TranslationHistory`] when one is
//! attached.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::history::{HistoryRecord, TranslationHistory};
use crate::hotkey::HotkeyEvent;
use crate::service::{TranslationService, WorkerId};
use crate::translation::{
    TranslationRequest, TranslationResult, TranslationSink, WorkerOutcome, language,
};

/// The user-facing side of the app.
pub trait Display: Send + Sync {
    /// A translation of `text` is about to start.
    fn on_translate_triggered(&self, text: &str);
    /// `text` was added to the source buffer.
    fn on_append_triggered(&self, text: &str);
    /// The full translation so far.
    fn on_progress(&self, partial: &str);
    fn on_complete(&self, result: &TranslationResult);
}

/// Sink for one attempt: forwards to the display and records a success.
struct DisplaySink {
    display: Arc<dyn Display>,
    history: Option<(Arc<TranslationHistory>, HistoryRecord)>,
}

impl TranslationSink for DisplaySink {
    fn on_progress(&self, partial: &str) {
        self.display.on_progress(partial);
    }

    fn on_complete(&self, result: &TranslationResult) {
        self.display.on_complete(result);

        if result.success
            && let Some((history, pending)) = &self.history
        {
            let mut record = pending.clone();
            record.translated_text.clone_from(&result.content);
            history.add(record);
        }
    }
}

/// Builds the request for `text` from resolved settings.
///
/// The source language is detected from the text; the target is the
/// configured language unless that is the source language itself.
pub fn build_request(settings: &ResolvedConfig, text: String) -> TranslationRequest {
    let source_language = language::detect(&text);
    let target_language = language::target_for(source_language, settings.target_language.code);

    TranslationRequest {
        text,
        source_language,
        target_language,
        prompt_template: settings.prompt_template.clone(),
        api_key: settings.api_key.clone(),
        base_url: settings.base_url.clone(),
        model: settings.model.clone(),
    }
}

pub struct App {
    settings: ResolvedConfig,
    service: Arc<TranslationService>,
    display: Arc<dyn Display>,
    history: Option<Arc<TranslationHistory>>,
    source_buffer: String,
}

impl App {
    pub fn new(
        settings: ResolvedConfig,
        service: Arc<TranslationService>,
        display: Arc<dyn Display>,
    ) -> Self {
        Self {
            settings,
            service,
            display,
            history: None,
            source_buffer: String::new(),
        }
    }

    /// Records every successful translation in `history`.
    #[must_use]
    pub fn with_history(mut self, history: Arc<TranslationHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn source_buffer(&self) -> &str {
        &self.source_buffer
    }

    /// Handles one detector event; returns the worker started, if any.
    pub async fn handle(&mut self, event: HotkeyEvent) -> Option<WorkerId> {
        match event {
            HotkeyEvent::Append(text) => {
                self.append(&text);
                None
            }
            HotkeyEvent::Translate(text) => self.translate(&text).await,
        }
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.source_buffer.is_empty() {
            self.source_buffer.push('\n');
        }
        self.source_buffer.push_str(text);

        debug!(chars = text.chars().count(), "Appended to source buffer");
        self.display.on_append_triggered(text);
    }

    /// Translates the buffered source followed by `text`.
    ///
    /// Whitespace-only input starts nothing and leaves the buffer alone.
    pub async fn translate(&mut self, text: &str) -> Option<WorkerId> {
        let final_text = match (self.source_buffer.is_empty(), text.is_empty()) {
            (_, true) => self.source_buffer.clone(),
            (true, false) => text.to_string(),
            (false, false) => format!("{}\n{text}", self.source_buffer),
        };

        if final_text.trim().is_empty() {
            debug!("Nothing to translate");
            return None;
        }

        self.source_buffer.clear();
        self.display.on_translate_triggered(&final_text);

        let request = build_request(&self.settings, final_text);
        info!(
            source = request.source_language.code,
            target = request.target_language.code,
            "Starting translation"
        );
        let sink = Arc::new(DisplaySink {
            display: Arc::clone(&self.display),
            history: self.history.as_ref().map(|history| {
                (
                    Arc::clone(history),
                    HistoryRecord::for_request(&request, &self.settings.skill_name),
                )
            }),
        });
        Some(self.service.start(request, sink).await)
    }

    pub fn cancel_current(&self) {
        self.service.cancel_current();
    }

    /// Waits for the translation in flight.
    pub async fn finish(&self) -> Option<WorkerOutcome> {
        self.service.join_current().await
    }

    /// Processes events until the channel closes, then shuts the service down.
    pub async fn run(mut self, mut events: UnboundedReceiver<HotkeyEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        debug!("Hotkey event channel closed");
        self.service.shutdown().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use crate::clock::ManualClock;
    use crate::config::HotkeysConfig;
    use crate::translation::{ChatBackend, ChatRequest, TextStream};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes the prompt back as one delta.
    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn open_stream(&self, request: ChatRequest<'_>) -> Result<TextStream> {
            let prompt = request.prompt.to_string();
            Ok(Box::pin(futures_util::stream::iter(vec![Ok(prompt)])))
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        log: Mutex<Vec<String>>,
    }

    impl RecordingDisplay {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Display for RecordingDisplay {
        fn on_translate_triggered(&self, text: &str) {
            self.log.lock().unwrap().push(format!("translate:{text}"));
        }

        fn on_append_triggered(&self, text: &str) {
            self.log.lock().unwrap().push(format!("append:{text}"));
        }

        fn on_progress(&self, partial: &str) {
            self.log.lock().unwrap().push(format!("progress:{partial}"));
        }

        fn on_complete(&self, result: &TranslationResult) {
            self.log
                .lock()
                .unwrap()
                .push(format!("complete:{}:{}", result.success, result.content));
        }
    }

    fn settings() -> ResolvedConfig {
        ResolvedConfig {
            provider_name: "test".to_string(),
            base_url: "http://localhost/v1/".to_string(),
            model: "test-model".to_string(),
            api_key: "sk-test".to_string(),
            skill_name: "echo".to_string(),
            prompt_template: "[{target_language_en}] {text}".to_string(),
            target_language: language::ENGLISH,
            hotkeys: HotkeysConfig::default(),
            cache: CacheOptions::default(),
        }
    }

    fn app() -> (App, Arc<RecordingDisplay>) {
        let display = Arc::new(RecordingDisplay::default());
        let service = Arc::new(TranslationService::new(None, Arc::new(EchoBackend)));
        (App::new(settings(), service, display.clone()), display)
    }

    fn app_with_history(
        backend: Arc<dyn ChatBackend>,
    ) -> (App, Arc<TranslationHistory>, Arc<RecordingDisplay>) {
        let display = Arc::new(RecordingDisplay::default());
        let service = Arc::new(TranslationService::new(None, backend));
        let history = Arc::new(TranslationHistory::in_memory(Arc::new(
            ManualClock::default(),
        )));
        let app = App::new(settings(), service, display.clone()).with_history(history.clone());
        (app, history, display)
    }

    /// Fails every request before streaming.
    struct RejectingBackend;

    #[async_trait]
    impl ChatBackend for RejectingBackend {
        async fn open_stream(&self, _request: ChatRequest<'_>) -> Result<TextStream> {
            anyhow::bail!("HTTP 500")
        }
    }

    #[test]
    fn test_build_request_swaps_target_for_same_language() {
        let request = build_request(&settings(), "hello".to_string());
        assert_eq!(request.source_language, language::ENGLISH);
        assert_eq!(request.target_language, language::CHINESE);

        let request = build_request(&settings(), "你好".to_string());
        assert_eq!(request.source_language, language::CHINESE);
        assert_eq!(request.target_language, language::ENGLISH);
        assert_eq!(request.api_key, "sk-test");
    }

    #[tokio::test]
    async fn test_translate_event_runs_to_completion() {
        let (mut app, display) = app();

        let id = app.handle(HotkeyEvent::Translate("hello".to_string())).await;
        assert!(id.is_some());
        assert!(matches!(app.finish().await, Some(WorkerOutcome::Completed(_))));

        assert_eq!(
            display.log(),
            vec![
                "translate:hello",
                "progress:[Chinese] hello",
                "progress:[Chinese] hello",
                "complete:true:[Chinese] hello",
            ]
        );
    }

    #[tokio::test]
    async fn test_appended_text_prefixes_next_translation() {
        let (mut app, display) = app();

        app.handle(HotkeyEvent::Append("first".to_string())).await;
        app.handle(HotkeyEvent::Append("second".to_string())).await;
        assert_eq!(app.source_buffer(), "first\nsecond");

        app.handle(HotkeyEvent::Translate("third".to_string())).await;
        app.finish().await;

        assert_eq!(app.source_buffer(), "");
        let log = display.log();
        assert_eq!(log[0], "append:first");
        assert_eq!(log[1], "append:second");
        assert_eq!(log[2], "translate:first\nsecond\nthird");
    }

    #[tokio::test]
    async fn test_empty_translate_uses_buffer_only() {
        let (mut app, display) = app();

        app.handle(HotkeyEvent::Append("buffered".to_string())).await;
        app.handle(HotkeyEvent::Translate(String::new())).await;
        app.finish().await;

        assert_eq!(display.log()[1], "translate:buffered");
    }

    #[tokio::test]
    async fn test_whitespace_only_starts_nothing() {
        let (mut app, display) = app();

        assert_eq!(app.handle(HotkeyEvent::Translate("  \n".to_string())).await, None);
        assert_eq!(app.handle(HotkeyEvent::Translate(String::new())).await, None);
        assert_eq!(app.handle(HotkeyEvent::Append(String::new())).await, None);

        assert!(display.log().is_empty());
        assert_eq!(app.finish().await, None);
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let (app, display) = app();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tx.send(HotkeyEvent::Append("a".to_string())).unwrap();
        drop(tx);
        app.run(rx).await;

        assert_eq!(display.log(), vec!["append:a"]);
    }

    #[tokio::test]
    async fn test_successful_translation_is_recorded_in_history() {
        let (mut app, history, _) = app_with_history(Arc::new(EchoBackend));

        app.handle(HotkeyEvent::Append("first".to_string())).await;
        app.handle(HotkeyEvent::Translate("second".to_string())).await;
        app.finish().await;

        let record = history.records(1).pop().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(record.source_text, "first\nsecond");
        assert_eq!(record.translated_text, "[Chinese] first\nsecond");
        assert_eq!(record.source_language, language::ENGLISH.code);
        assert_eq!(record.target_language, language::CHINESE.code);
        assert_eq!(record.model, "test-model");
        assert_eq!(record.skill, "echo");
    }

    #[tokio::test]
    async fn test_failed_translation_is_not_recorded() {
        let (mut app, history, display) = app_with_history(Arc::new(RejectingBackend));

        app.handle(HotkeyEvent::Translate("hello".to_string())).await;
        app.finish().await;

        assert!(display.log().last().unwrap().starts_with("complete:false"));
        assert!(history.is_empty());
    }

}
