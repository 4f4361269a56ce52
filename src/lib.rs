//! # seltl - translate the selection with a double-tap
//!
//! `seltl` watches for double presses of a modifier key anywhere on the
//! desktop, copies the currently selected text, and streams a translation
//! of it from an OpenAI-compatible chat endpoint.
//!
//! ## Features
//!
//! - **Double-press hotkeys**: double-tap Ctrl to translate, Shift to collect
//!   several selections into one translation
//! - **Streaming**: partial translations are shown as they arrive, and a new
//!   trigger cancels the one in flight
//! - **Caching**: repeated text is answered from a `SQLite`-backed cache
//! - **Skills**: prompt templates with named placeholders
//! - **History**: the last 1000 translations, listed with `seltl history`
//!
//! ## Quick Start
//!
//! ```bash
//! # Listen for hotkeys (needs the `os` feature)
//! seltl run
//!
//! # One-shot translation
//! seltl translate "Bonjour tout le monde" --to English
//! echo "你好" | seltl translate
//! ```
//!
//! ## Configuration
//!
//! Settings are stored in `~/.config/seltl/config.toml`:
//!
//! ```toml
//! [seltl]
//! provider = "local"
//! model = "qwen2.5:7b"
//! to = "Chinese"
//!
//! [providers.local]
//! base_url = "http://localhost:11434/v1/"
//! models = ["qwen2.5:7b"]
//!
//! [hotkeys.append]
//! key = "alt"
//! ```

/// Orchestration of hotkey events, the source buffer and the display.
pub mod app;

/// Debounced translation cache with `SQLite` persistence.
pub mod cache;

/// Command-line interface definitions and handlers.
pub mod cli;

/// Selection capture through the system clipboard.
pub mod clipboard;

/// Injectable wall clock.
pub mod clock;

/// Configuration file management and provider settings.
pub mod config;

/// File system utilities.
pub mod fs;

/// Persistent history of successful translations.
pub mod history;

/// Double-press modifier hotkey detection.
pub mod hotkey;

/// Input reading from arguments, files and stdin.
pub mod input;

/// Diagnostic logging setup.
pub mod logging;

/// XDG-style path utilities for configuration, cache and data.
pub mod paths;

/// At-most-one-in-flight translation management.
pub mod service;

/// Streaming translation against OpenAI-compatible APIs.
pub mod translation;

/// Terminal UI components (display, spinner, colors).
pub mod ui;
