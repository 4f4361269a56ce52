use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use super::{DoublePressDetector, KeyRelease};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A source of global key releases.
pub trait KeyHook {
    fn subscribe(&self) -> Result<KeySubscription>;
}

/// Pull-style view of a push-style OS hook.
///
/// Iterating blocks until the next release arrives, the hook side hangs up,
/// or the subscription is cancelled.
pub struct KeySubscription {
    receiver: Receiver<KeyRelease>,
    cancelled: Arc<AtomicBool>,
}

impl KeySubscription {
    /// Creates a subscription and the sender the hook side pushes into.
    pub fn channel() -> (Sender<KeyRelease>, Self) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let subscription = Self {
            receiver,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        (sender, subscription)
    }

    /// Flag shared with the hook side; set once the subscription is cancelled.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Iterator for KeySubscription {
    type Item = KeyRelease;

    fn next(&mut self) -> Option<KeyRelease> {
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return None;
            }
            match self.receiver.recv_timeout(STOP_POLL_INTERVAL) {
                Ok(release) => return Some(release),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

/// Handle to the thread running a detector's receive loop.
pub struct DetectorThread {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DetectorThread {
    /// Cancels the subscription and waits for the loop to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("Hotkey detector thread panicked");
        }
    }
}

impl Drop for DetectorThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs `detector` over `subscription` on a dedicated thread.
pub fn spawn_detector(
    mut detector: DoublePressDetector,
    subscription: KeySubscription,
) -> Result<DetectorThread> {
    let cancelled = subscription.cancel_flag();

    let handle = thread::Builder::new()
        .name("hotkey-detector".to_string())
        .spawn(move || {
            info!("Hotkey detector started");
            for release in subscription {
                detector.on_release(release.key, release.at);
            }
            debug!("Hotkey detector stopped");
        })
        .context("Failed to spawn hotkey detector thread")?;

    Ok(DetectorThread {
        cancelled,
        handle: Some(handle),
    })
}

#[cfg(feature = "os")]
pub use os::RdevHook;

#[cfg(feature = "os")]
mod os {
    use anyhow::{Context, Result};
    use rdev::{EventType, Key};
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::Instant;

    use super::{KeyHook, KeySubscription};
    use crate::hotkey::{HotkeyId, KeyRelease};

    /// Global keyboard hook backed by `rdev::listen`.
    ///
    /// `rdev` offers no way to stop listening, so cancelling the subscription
    /// only stops forwarding; the listen thread lives until process exit.
    #[derive(Debug, Default)]
    pub struct RdevHook;

    impl KeyHook for RdevHook {
        fn subscribe(&self) -> Result<KeySubscription> {
            let (sender, subscription) = KeySubscription::channel();
            let cancelled = subscription.cancel_flag();

            thread::Builder::new()
                .name("rdev-listen".to_string())
                .spawn(move || {
                    let callback = move |event: rdev::Event| {
                        if cancelled.load(Ordering::Relaxed) {
                            return;
                        }
                        if let EventType::KeyRelease(key) = event.event_type
                            && let Some(id) = hotkey_for(key)
                        {
                            let _ = sender.send(KeyRelease {
                                key: Some(id),
                                at: Instant::now(),
                            });
                        }
                    };

                    if let Err(e) = rdev::listen(callback) {
                        tracing::error!("Global key hook failed: {e:?}");
                    }
                })
                .context("Failed to spawn key hook thread")?;

            Ok(subscription)
        }
    }

    const fn hotkey_for(key: Key) -> Option<HotkeyId> {
        match key {
            Key::ControlLeft | Key::ControlRight => Some(HotkeyId::Primary),
            Key::ShiftLeft | Key::ShiftRight => Some(HotkeyId::Secondary),
            Key::Alt | Key::AltGr => Some(HotkeyId::Tertiary),
            _ => None,
        }
    }
}
