use anyhow::Result;

use crate::cli::Overrides;

pub struct RunOptions {
    pub quiet: bool,
    pub overrides: Overrides,
}

#[cfg(not(feature = "os"))]
#[allow(clippy::unused_async)]
pub async fn run(_options: RunOptions) -> Result<()> {
    anyhow::bail!(
        "Hotkey mode is not available in this build.\n\n\
         Rebuild with OS integration enabled:\n  \
         cargo install seltl --features os\n\n\
         'seltl translate <TEXT>' works without it."
    )
}

/// Listens for double presses until Ctrl+C.
#[cfg(feature = "os")]
pub async fn run(options: RunOptions) -> Result<()> {
    use anyhow::Context;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tracing::{info, warn};

    use super::cache::open_cache;
    use super::history::open_history;
    use super::load_settings;
    use crate::app::App;
    use crate::clipboard::{ClipboardTextAcquirer, SystemClipboard, SystemKeySynth};
    use crate::hotkey::{DoublePressDetector, HotkeyBindings, KeyHook, RdevHook, spawn_detector};
    use crate::service::TranslationService;
    use crate::translation::TranslationClient;
    use crate::ui::{Style, TerminalDisplay};

    let settings = load_settings(options.overrides)?;
    let hotkeys = settings.hotkeys;

    let cache = open_cache(settings.cache.clone())?;
    let service = Arc::new(TranslationService::new(
        Some(cache),
        Arc::new(TranslationClient::new()),
    ));
    let display = Arc::new(TerminalDisplay::new().quiet(options.quiet));

    let acquirer = Arc::new(ClipboardTextAcquirer::new(
        Arc::new(SystemClipboard::new()?),
        Arc::new(SystemKeySynth),
    ));
    let bindings = HotkeyBindings::from_config(
        (hotkeys.translate.key, hotkeys.translate.enabled),
        (hotkeys.append.key, hotkeys.append.enabled),
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let detector = DoublePressDetector::new(bindings, acquirer, events_tx);
    let detector_thread = spawn_detector(detector, RdevHook.subscribe()?)?;

    if !options.quiet {
        eprintln!(
            "{} double-tap {} to translate, {} to append. Ctrl+C to quit.",
            Style::header("Listening:"),
            Style::key(hotkeys.translate.key.display_name()),
            Style::key(hotkeys.append.key.display_name()),
        );
    }

    let app = App::new(settings, service, display).with_history(open_history()?);
    let mut app_task = tokio::spawn(app.run(events_rx));

    let app_finished = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Shutting down");
            false
        }
        _ = &mut app_task => {
            warn!("Event loop ended unexpectedly");
            true
        }
    };

    // The detector owns the event sender; stopping it closes the channel and
    // lets the app loop shut the service down.
    tokio::task::spawn_blocking(move || detector_thread.stop())
        .await
        .context("Hotkey detector did not stop cleanly")?;

    if !app_finished {
        app_task.await.context("Event loop panicked")?;
    }

    Ok(())
}
