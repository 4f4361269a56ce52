use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::{Clipboard, KeySynth, TextSource};

/// Timing for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOptions {
    /// How many times to look for the copied text.
    pub poll_attempts: u32,
    /// Sleep before each look.
    pub poll_interval: Duration,
    /// Grace period before the user's clipboard content is put back.
    pub restore_delay: Duration,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            poll_attempts: 10,
            poll_interval: Duration::from_millis(20),
            restore_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    // Clipboard content still waiting to be restored.
    pending_restore: Option<String>,
    generation: u64,
}

/// Reads the foreground selection by simulating a copy.
///
/// Captures are serialized behind one lock. The user's clipboard content is
/// restored on a background thread after `restore_delay`; a capture that
/// starts before that restore has run takes over the pending content instead
/// of snapshotting its predecessor's capture.
pub struct ClipboardTextAcquirer {
    clipboard: Arc<dyn Clipboard>,
    synth: Arc<dyn KeySynth>,
    options: AcquireOptions,
    session: Arc<Mutex<SessionState>>,
}

impl ClipboardTextAcquirer {
    pub fn new(clipboard: Arc<dyn Clipboard>, synth: Arc<dyn KeySynth>) -> Self {
        Self {
            clipboard,
            synth,
            options: AcquireOptions::default(),
            session: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: AcquireOptions) -> Self {
        self.options = options;
        self
    }

    /// Captures the current selection, or an empty string if there is none.
    ///
    /// Blocks for at most `poll_attempts * poll_interval` plus the time spent
    /// waiting for an earlier capture.
    pub fn acquire_selection(&self) -> String {
        let mut session = lock(&self.session);

        let original = match session.pending_restore.take() {
            // The clipboard still holds the previous capture.
            Some(pending) => pending,
            None => self.clipboard.read().unwrap_or_else(|e| {
                warn!("Failed to read clipboard before capture: {e:#}");
                String::new()
            }),
        };

        if let Err(e) = self.clipboard.write("") {
            warn!("Failed to clear clipboard: {e:#}");
        }

        let captured = match self.synth.send_copy() {
            Ok(()) => self.poll_clipboard(),
            Err(e) => {
                warn!("Failed to synthesize copy: {e:#}");
                String::new()
            }
        };

        self.schedule_restore(&mut session, original);

        debug!(chars = captured.chars().count(), "Selection captured");
        captured
    }

    fn poll_clipboard(&self) -> String {
        for _ in 0..self.options.poll_attempts {
            thread::sleep(self.options.poll_interval);
            match self.clipboard.read() {
                Ok(text) if !text.is_empty() => return text,
                Ok(_) => {}
                Err(e) => debug!("Clipboard not readable yet: {e:#}"),
            }
        }
        String::new()
    }

    fn schedule_restore(&self, session: &mut SessionState, original: String) {
        session.generation += 1;
        session.pending_restore = Some(original.clone());

        let generation = session.generation;
        let shared = Arc::clone(&self.session);
        let clipboard = Arc::clone(&self.clipboard);
        let delay = self.options.restore_delay;

        let spawned = thread::Builder::new()
            .name("clipboard-restore".to_string())
            .spawn(move || {
                thread::sleep(delay);
                let mut session = lock(&shared);
                if session.generation != generation {
                    debug!("Clipboard restore superseded by a newer capture");
                    return;
                }
                if let Some(original) = session.pending_restore.take()
                    && let Err(e) = clipboard.write(&original)
                {
                    warn!("Failed to restore clipboard: {e:#}");
                }
            });

        if let Err(e) = spawned {
            warn!("Failed to spawn clipboard restore, restoring now: {e}");
            session.pending_restore = None;
            if let Err(e) = self.clipboard.write(&original) {
                warn!("Failed to restore clipboard: {e:#}");
            }
        }
    }
}

impl TextSource for ClipboardTextAcquirer {
    fn acquire(&self) -> String {
        self.acquire_selection()
    }
}

fn lock(session: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[derive(Default)]
    struct FakeClipboard {
        content: Mutex<String>,
    }

    impl FakeClipboard {
        fn with(content: &str) -> Arc<Self> {
            Arc::new(Self {
                content: Mutex::new(content.to_string()),
            })
        }

        fn content(&self) -> String {
            self.content.lock().unwrap().clone()
        }
    }

    impl Clipboard for FakeClipboard {
        fn read(&self) -> Result<String> {
            Ok(self.content.lock().unwrap().clone())
        }

        fn write(&self, text: &str) -> Result<()> {
            *self.content.lock().unwrap() = text.to_string();
            Ok(())
        }
    }

    /// Plays the foreground app: answers the copy chord with its selection,
    /// optionally after a delay.
    struct FakeApp {
        clipboard: Arc<FakeClipboard>,
        selection: Mutex<String>,
        latency: Duration,
    }

    impl FakeApp {
        fn new(clipboard: &Arc<FakeClipboard>, selection: &str, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                clipboard: Arc::clone(clipboard),
                selection: Mutex::new(selection.to_string()),
                latency,
            })
        }

        fn select(&self, text: &str) {
            *self.selection.lock().unwrap() = text.to_string();
        }
    }

    impl KeySynth for FakeApp {
        fn send_copy(&self) -> Result<()> {
            let selection = self.selection.lock().unwrap().clone();
            if selection.is_empty() {
                return Ok(());
            }
            let clipboard = Arc::clone(&self.clipboard);
            let latency = self.latency;
            thread::spawn(move || {
                thread::sleep(latency);
                clipboard.write(&selection).unwrap();
            });
            Ok(())
        }
    }

    fn fast_options() -> AcquireOptions {
        AcquireOptions {
            poll_attempts: 10,
            poll_interval: Duration::from_millis(10),
            restore_delay: Duration::from_millis(30),
        }
    }

    fn wait_for_restore() {
        thread::sleep(Duration::from_millis(150));
    }

    #[test]
    fn test_captures_selection_and_restores_clipboard() {
        let clipboard = FakeClipboard::with("user data");
        let app = FakeApp::new(&clipboard, "selected words", Duration::ZERO);
        let acquirer =
            ClipboardTextAcquirer::new(clipboard.clone(), app).with_options(fast_options());

        assert_eq!(acquirer.acquire_selection(), "selected words");

        wait_for_restore();
        assert_eq!(clipboard.content(), "user data");
    }

    #[test]
    fn test_restore_is_deferred() {
        let clipboard = FakeClipboard::with("user data");
        let app = FakeApp::new(&clipboard, "selected", Duration::ZERO);
        let acquirer = ClipboardTextAcquirer::new(clipboard.clone(), app).with_options(
            AcquireOptions {
                restore_delay: Duration::from_millis(300),
                ..fast_options()
            },
        );

        acquirer.acquire_selection();

        // The foreground app may still be reading back what it copied.
        assert_eq!(clipboard.content(), "selected");
    }

    #[test]
    fn test_polling_waits_for_slow_app() {
        let clipboard = FakeClipboard::with("");
        let app = FakeApp::new(&clipboard, "late", Duration::from_millis(40));
        let acquirer =
            ClipboardTextAcquirer::new(clipboard.clone(), app).with_options(fast_options());

        assert_eq!(acquirer.acquire_selection(), "late");
    }

    #[test]
    fn test_empty_selection_returns_empty_and_restores() {
        let clipboard = FakeClipboard::with("user data");
        let app = FakeApp::new(&clipboard, "", Duration::ZERO);
        let acquirer =
            ClipboardTextAcquirer::new(clipboard.clone(), app).with_options(fast_options());

        assert_eq!(acquirer.acquire_selection(), "");

        wait_for_restore();
        assert_eq!(clipboard.content(), "user data");
    }

    #[test]
    fn test_back_to_back_captures_keep_users_content() {
        let clipboard = FakeClipboard::with("user data");
        let app = FakeApp::new(&clipboard, "first", Duration::ZERO);
        let acquirer = ClipboardTextAcquirer::new(clipboard.clone(), app.clone())
            .with_options(fast_options());

        assert_eq!(acquirer.acquire_selection(), "first");
        app.select("second");
        assert_eq!(acquirer.acquire_selection(), "second");

        wait_for_restore();
        assert_eq!(clipboard.content(), "user data");
    }

    #[test]
    fn test_concurrent_captures_are_serialized() {
        let clipboard = FakeClipboard::with("user data");
        let app = FakeApp::new(&clipboard, "same", Duration::from_millis(5));
        let acquirer = Arc::new(
            ClipboardTextAcquirer::new(clipboard.clone(), app).with_options(fast_options()),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let acquirer = Arc::clone(&acquirer);
                thread::spawn(move || acquirer.acquire_selection())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "same");
        }

        wait_for_restore();
        assert_eq!(clipboard.content(), "user data");
    }
}
