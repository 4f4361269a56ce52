//! Subcommand implementations.

use anyhow::Result;

use crate::config::{ConfigManager, ResolveOptions, ResolvedConfig, resolve_config};

use super::Overrides;

/// Cache inspection and clearing.
pub mod cache;

/// Configuration inspection and initialization.
pub mod config;

/// Translation history listing and clearing.
pub mod history;

/// Hotkey listening mode.
pub mod run;

/// One-shot translation.
pub mod translate;

impl From<Overrides> for ResolveOptions {
    fn from(overrides: Overrides) -> Self {
        Self {
            to: overrides.to,
            provider: overrides.provider,
            model: overrides.model,
            skill: overrides.skill,
        }
    }
}

/// Loads the config file and merges `overrides` over it.
pub fn load_settings(overrides: Overrides) -> Result<ResolvedConfig> {
    let manager = ConfigManager::new()?;
    let config_file = manager.load_or_default()?;
    resolve_config(&overrides.into(), &config_file)
}
