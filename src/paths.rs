//! XDG-style path utilities for configuration, cache and data directories.
//!
//! Paths follow the XDG Base Directory conventions on every platform
//! rather than OS-specific locations, so the config file is easy to find.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "seltl";

/// Returns the configuration directory.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/seltl` if `XDG_CONFIG_HOME` is set
/// 2. `~/.config/seltl` otherwise
pub fn config_dir() -> Result<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Returns the cache directory.
///
/// Resolution order:
/// 1. `$XDG_CACHE_HOME/seltl` if `XDG_CACHE_HOME` is set
/// 2. `~/.cache/seltl` otherwise
pub fn cache_dir() -> Result<PathBuf> {
    xdg_dir("XDG_CACHE_HOME", ".cache")
}

/// Returns the data directory, where translation history lives.
///
/// Resolution order:
/// 1. `$XDG_DATA_HOME/seltl` if `XDG_DATA_HOME` is set
/// 2. `~/.local/share/seltl` otherwise
pub fn data_dir() -> Result<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

fn xdg_dir(env_var: &str, home_fallback: &str) -> Result<PathBuf> {
    if let Ok(xdg) = std::env::var(env_var)
        && !xdg.is_empty()
    {
        return Ok(PathBuf::from(xdg).join(APP_DIR));
    }

    let home = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home.join(home_fallback).join(APP_DIR))
}
