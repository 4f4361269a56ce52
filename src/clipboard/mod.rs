//! Selection capture through the OS clipboard.
//!
//! The clipboard and the input synthesizer are narrow traits so the
//! save/copy/poll/restore sequence in [`ClipboardTextAcquirer`] can run
//! against in-memory fakes.

mod acquirer;
#[cfg(feature = "os")]
mod system;

use anyhow::Result;

pub use acquirer::{AcquireOptions, ClipboardTextAcquirer};
#[cfg(feature = "os")]
pub use system::{SystemClipboard, SystemKeySynth};

/// The single, global OS clipboard.
pub trait Clipboard: Send + Sync {
    fn read(&self) -> Result<String>;
    fn write(&self, text: &str) -> Result<()>;
}

/// Synthesizes input at the OS level.
pub trait KeySynth: Send + Sync {
    /// Presses and releases the platform copy chord.
    fn send_copy(&self) -> Result<()>;
}

/// Anything that can produce the user's current selection.
///
/// Never fails: an unavailable selection is the empty string.
pub trait TextSource: Send + Sync {
    fn acquire(&self) -> String;
}
