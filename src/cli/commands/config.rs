use anyhow::{Result, bail};

use super::load_settings;
use crate::cli::Overrides;
use crate::config::{ConfigFile, ConfigManager, HotkeyConfig, ResolvedConfig};
use crate::ui::Style;

pub fn print_path() -> Result<()> {
    let manager = ConfigManager::new()?;
    println!("{}", manager.config_path().display());
    Ok(())
}

/// Writes a config file holding every default.
pub fn init(force: bool) -> Result<()> {
    let manager = ConfigManager::new()?;
    if !manager.init(&ConfigFile::starter(), force)? {
        bail!(
            "Config file already exists: {} (use --force to overwrite)",
            manager.config_path().display()
        );
    }

    println!(
        "{} Wrote {}",
        Style::success("✓"),
        Style::secondary(manager.config_path().display().to_string())
    );
    Ok(())
}

/// Prints the settings `run` and `translate` would use with `overrides`.
pub fn show(overrides: Overrides) -> Result<()> {
    let settings = load_settings(overrides)?;
    print_settings(&settings);
    Ok(())
}

fn print_settings(settings: &ResolvedConfig) {
    println!("{}", Style::header("Effective settings"));
    println!(
        "  {}  {}",
        Style::label("provider"),
        Style::value(&settings.provider_name)
    );
    println!(
        "  {}  {}",
        Style::label("base_url"),
        Style::value(&settings.base_url)
    );
    println!(
        "  {}   {}",
        Style::label("api_key"),
        if settings.api_key.is_empty() {
            Style::error("(not set)")
        } else {
            Style::secondary("(set)")
        }
    );
    println!(
        "  {}     {}",
        Style::label("model"),
        Style::value(&settings.model)
    );
    println!(
        "  {}     {}",
        Style::label("skill"),
        Style::value(&settings.skill_name)
    );
    println!(
        "  {}        {} {}",
        Style::label("to"),
        Style::value(settings.target_language.code),
        Style::secondary(settings.target_language.native)
    );
    println!();

    println!("{}", Style::header("Hotkeys"));
    print_hotkey("translate", settings.hotkeys.translate);
    print_hotkey("append", settings.hotkeys.append);
    println!();

    println!("{}", Style::header("Cache"));
    println!(
        "  {}        {}",
        Style::label("max_size"),
        Style::value(settings.cache.max_size)
    );
    println!(
        "  {}  {}",
        Style::label("save_frequency"),
        Style::value(settings.cache.save_frequency)
    );
    println!(
        "  {}      {}",
        Style::label("min_gap_ms"),
        Style::value(settings.cache.min_gap.as_millis())
    );
}

fn print_hotkey(action: &str, hotkey: HotkeyConfig) {
    let state = if hotkey.enabled {
        Style::success("enabled")
    } else {
        Style::secondary("disabled")
    };
    println!(
        "  {}  double {} ({state})",
        Style::label(format!("{action:9}")),
        Style::key(hotkey.key.display_name())
    );
}
