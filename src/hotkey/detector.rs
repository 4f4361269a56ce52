use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use super::{HotkeyAction, HotkeyBindings, HotkeyEvent, HotkeyId};
use crate::clipboard::TextSource;

/// Two releases of the same key closer than this are a double press.
pub const DOUBLE_PRESS_WINDOW: Duration = Duration::from_millis(200);

/// A Translate dispatch silences its key for this long.
pub const COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Clone, Copy)]
struct KeyTimingState {
    last_release: Option<Instant>,
    cooldown_until: Option<Instant>,
}

/// Turns raw key releases into Translate/Append triggers.
///
/// All state is mutated from the single thread that feeds
/// [`on_release`](Self::on_release), so releases are handled strictly in
/// arrival order. Bindings live in a shared [`HotkeyBindings`] table and can
/// change at any time without touching per-key timing.
pub struct DoublePressDetector {
    bindings: HotkeyBindings,
    timing: [KeyTimingState; 3],
    text_source: Arc<dyn TextSource>,
    events: UnboundedSender<HotkeyEvent>,
    last_text: String,
    append_pending: bool,
    // Releases stamped before this instant came from our own copy chord.
    synthetic_until: Option<Instant>,
    window: Duration,
    cooldown: Duration,
}

impl DoublePressDetector {
    pub fn new(
        bindings: HotkeyBindings,
        text_source: Arc<dyn TextSource>,
        events: UnboundedSender<HotkeyEvent>,
    ) -> Self {
        Self {
            bindings,
            timing: [KeyTimingState::default(); 3],
            text_source,
            events,
            last_text: String::new(),
            append_pending: false,
            synthetic_until: None,
            window: DOUBLE_PRESS_WINDOW,
            cooldown: COOLDOWN,
        }
    }

    #[must_use]
    pub fn with_timing(mut self, window: Duration, cooldown: Duration) -> Self {
        self.window = window;
        self.cooldown = cooldown;
        self
    }

    pub fn bindings(&self) -> &HotkeyBindings {
        &self.bindings
    }

    /// Handles one key release and returns the action it dispatched, if any.
    pub fn on_release(&mut self, key: Option<HotkeyId>, at: Instant) -> Option<HotkeyAction> {
        let id = key?;

        if self.synthetic_until.is_some_and(|until| at < until) {
            trace!(hotkey = id.display_name(), "Ignoring synthetic key release");
            return None;
        }

        let state = &mut self.timing[id.index()];
        if state.cooldown_until.is_some_and(|until| at < until) {
            trace!(hotkey = id.display_name(), "Ignoring release during cooldown");
            return None;
        }

        let is_double = state
            .last_release
            .is_some_and(|last| at.saturating_duration_since(last) < self.window);
        if !is_double {
            state.last_release = Some(at);
            return None;
        }

        // Invariant: the first-half stamp is rewound by one window rather than
        // cleared, so a third quick release starts a new pair instead of
        // completing a second one.
        state.last_release = state
            .last_release
            .and_then(|last| last.checked_sub(self.window));

        let binding = self.bindings.get(id);
        if !binding.enabled {
            return None;
        }

        match binding.action {
            HotkeyAction::Translate => {
                self.timing[id.index()].cooldown_until = Some(at + self.cooldown);
                debug!(hotkey = id.display_name(), "Translate hotkey triggered");
                self.dispatch_translate(at);
            }
            HotkeyAction::Append => {
                debug!(hotkey = id.display_name(), "Append hotkey triggered");
                self.dispatch_append(at);
            }
        }

        Some(binding.action)
    }

    fn dispatch_translate(&mut self, at: Instant) {
        let text = self.acquire(at);

        let payload = if self.append_pending {
            // Nothing new selected since the append: use the buffer only.
            if text == self.last_text {
                String::new()
            } else {
                text.clone()
            }
        } else if text.is_empty() {
            self.last_text.clone()
        } else {
            text.clone()
        };

        self.append_pending = false;
        if !text.is_empty() {
            self.last_text = text;
        }

        self.emit(HotkeyEvent::Translate(payload));
    }

    fn dispatch_append(&mut self, at: Instant) {
        // The copy chord below releases a modifier; it must never count as
        // the first half of a Translate double press.
        for id in self.bindings.bound_to(HotkeyAction::Translate) {
            self.timing[id.index()].last_release = None;
        }

        let text = self.acquire(at);
        self.last_text.clone_from(&text);
        self.append_pending = true;

        self.emit(HotkeyEvent::Append(text));
    }

    fn acquire(&mut self, at: Instant) -> String {
        let text = self.text_source.acquire();
        self.synthetic_until = Some(Instant::now().max(at));
        text
    }

    fn emit(&self, event: HotkeyEvent) {
        if self.events.send(event).is_err() {
            debug!("Hotkey event dropped: receiver closed");
        }
    }
}
