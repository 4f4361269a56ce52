use anyhow::{Context, Result, anyhow};
use std::sync::{Mutex, PoisonError};

use super::{Clipboard, KeySynth};

/// The OS clipboard through `arboard`.
pub struct SystemClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().context("Failed to open the system clipboard")?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }
}

impl Clipboard for SystemClipboard {
    fn read(&self) -> Result<String> {
        let mut clipboard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match clipboard.get_text() {
            Ok(text) => Ok(text),
            // An empty or non-text clipboard reads as no text.
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(anyhow!("Failed to read clipboard: {e}")),
        }
    }

    fn write(&self, text: &str) -> Result<()> {
        let mut clipboard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if text.is_empty() {
            clipboard.clear().context("Failed to clear clipboard")
        } else {
            clipboard
                .set_text(text.to_string())
                .context("Failed to write clipboard")
        }
    }
}

/// Copy-chord synthesis through `enigo`.
#[derive(Debug, Default)]
pub struct SystemKeySynth;

impl KeySynth for SystemKeySynth {
    fn send_copy(&self) -> Result<()> {
        use enigo::{Direction, Enigo, Key, Keyboard, Settings};

        // Enigo is not Send on every platform; build one per chord.
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow!("Failed to initialize input synthesis: {e:?}"))?;

        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| anyhow!("Failed to press modifier: {e:?}"))?;
        let clicked = enigo.key(Key::Unicode('c'), Direction::Click);
        // Always release the modifier, even if the click failed.
        let released = enigo.key(modifier, Direction::Release);

        clicked.map_err(|e| anyhow!("Failed to press copy key: {e:?}"))?;
        released.map_err(|e| anyhow!("Failed to release modifier: {e:?}"))?;
        Ok(())
    }
}
