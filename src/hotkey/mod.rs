//! Double-press modifier hotkeys.
//!
//! Raw key releases from a global hook flow through a [`KeySubscription`]
//! into a [`DoublePressDetector`], which turns them into [`HotkeyEvent`]s.

mod detector;
mod listener;

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

pub use detector::{COOLDOWN, DOUBLE_PRESS_WINDOW, DoublePressDetector};
#[cfg(feature = "os")]
pub use listener::RdevHook;
pub use listener::{DetectorThread, KeyHook, KeySubscription, spawn_detector};

/// One of the tracked modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HotkeyId {
    #[serde(rename = "ctrl")]
    Primary,
    #[serde(rename = "shift")]
    Secondary,
    #[serde(rename = "alt")]
    Tertiary,
}

impl HotkeyId {
    pub const ALL: [Self; 3] = [Self::Primary, Self::Secondary, Self::Tertiary];

    pub const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
            Self::Tertiary => 2,
        }
    }

    /// Parses a config name (`ctrl`, `shift`, `alt`), ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::Primary),
            "shift" => Some(Self::Secondary),
            "alt" | "option" => Some(Self::Tertiary),
            _ => None,
        }
    }

    pub const fn config_name(self) -> &'static str {
        match self {
            Self::Primary => "ctrl",
            Self::Secondary => "shift",
            Self::Tertiary => "alt",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Primary => "Ctrl",
            Self::Secondary => "Shift",
            Self::Tertiary => "Alt",
        }
    }
}

/// The logical action a hotkey triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    /// Acquire the selection and translate it.
    Translate,
    /// Acquire the selection and buffer it for the next translation.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub action: HotkeyAction,
    pub enabled: bool,
}

impl HotkeyBinding {
    pub const fn new(action: HotkeyAction, enabled: bool) -> Self {
        Self { action, enabled }
    }

    const fn disabled() -> Self {
        Self::new(HotkeyAction::Translate, false)
    }
}

/// Shared binding table, one entry per [`HotkeyId`].
///
/// Clones share the same table, so the UI side can rebind keys while the
/// detector thread keeps reading it.
#[derive(Debug, Clone)]
pub struct HotkeyBindings {
    table: Arc<RwLock<[HotkeyBinding; 3]>>,
}

impl HotkeyBindings {
    pub fn new(table: [HotkeyBinding; 3]) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    /// Builds the table from the translate and append key settings.
    ///
    /// Keys not named are disabled. When both settings name the same key
    /// the translate binding wins unless it is disabled and append is not.
    pub fn from_config(translate: (HotkeyId, bool), append: (HotkeyId, bool)) -> Self {
        let (translate_id, translate_enabled) = translate;
        let (append_id, append_enabled) = append;

        let mut table = [HotkeyBinding::disabled(); 3];
        table[append_id.index()] = HotkeyBinding::new(HotkeyAction::Append, append_enabled);
        if translate_enabled || translate_id != append_id || !append_enabled {
            table[translate_id.index()] =
                HotkeyBinding::new(HotkeyAction::Translate, translate_enabled);
        }
        Self::new(table)
    }

    pub fn get(&self, id: HotkeyId) -> HotkeyBinding {
        self.table.read().unwrap_or_else(PoisonError::into_inner)[id.index()]
    }

    /// Rebinds one key. Other keys' bindings and all timing state are kept.
    pub fn set_hotkey(&self, id: HotkeyId, action: HotkeyAction, enabled: bool) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table[id.index()] = HotkeyBinding::new(action, enabled);
        tracing::info!(
            hotkey = id.display_name(),
            ?action,
            enabled,
            "Hotkey binding updated"
        );
    }

    /// Ids currently bound to `action`, enabled or not.
    pub fn bound_to(&self, action: HotkeyAction) -> Vec<HotkeyId> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        HotkeyId::ALL
            .into_iter()
            .filter(|id| table[id.index()].action == action)
            .collect()
    }
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self::from_config((HotkeyId::Primary, true), (HotkeyId::Secondary, true))
    }
}

/// A logical trigger produced by the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// Freshly acquired text. Empty means "translate the buffered text only".
    Translate(String),
    /// Text to add to the source buffer, possibly empty.
    Append(String),
}

/// A raw key release reported by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRelease {
    /// `None` for keys the detector does not track.
    pub key: Option<HotkeyId>,
    pub at: Instant,
}
