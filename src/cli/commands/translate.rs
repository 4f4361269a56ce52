use anyhow::{Result, bail};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::cache::open_cache;
use super::history::open_history;
use super::load_settings;
use crate::app::App;
use crate::cli::Overrides;
use crate::input::{InputReader, InputSource};
use crate::service::TranslationService;
use crate::translation::{TranslationClient, WorkerOutcome};
use crate::ui::TerminalDisplay;

pub struct TranslateOptions {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub no_cache: bool,
    pub quiet: bool,
    pub overrides: Overrides,
}

/// Translates one piece of text and waits for the result.
///
/// Returns `false` when the translation failed; the error has already been
/// shown by the display.
pub async fn run_translate(options: TranslateOptions) -> Result<bool> {
    let settings = load_settings(options.overrides)?;

    let source = InputSource::pick(options.text.as_deref(), options.file.as_deref());
    let source_text = InputReader::read(&source)?;
    let source_text = source_text.trim_end();

    if source_text.trim().is_empty() {
        bail!("Input is empty");
    }

    let cache = if options.no_cache {
        None
    } else {
        Some(open_cache(settings.cache.clone())?)
    };
    let service = Arc::new(TranslationService::new(
        cache,
        Arc::new(TranslationClient::new()),
    ));
    let display = Arc::new(
        TerminalDisplay::new()
            .echo_source(false)
            .quiet(options.quiet),
    );

    let mut app =
        App::new(settings, Arc::clone(&service), display).with_history(open_history()?);
    app.translate(source_text).await;
    let outcome = app.finish().await;
    service.shutdown().await;

    let success = match outcome {
        Some(WorkerOutcome::Completed(result)) => result.success,
        Some(WorkerOutcome::Cancelled) | None => false,
    };
    debug!(success, "One-shot translation finished");
    Ok(success)
}
