use anyhow::Result;
use std::sync::Arc;

use crate::cache::{CacheOptions, SqliteCacheStore, TranslationCache};
use crate::clock::SystemClock;
use crate::config::ConfigManager;
use crate::paths;
use crate::ui::Style;

/// Opens the on-disk translation cache.
pub fn open_cache(options: CacheOptions) -> Result<Arc<TranslationCache>> {
    let store = SqliteCacheStore::new()?;
    Ok(Arc::new(TranslationCache::new(
        options,
        Some(Box::new(store)),
        Arc::new(SystemClock),
    )))
}

fn configured_cache() -> Result<Arc<TranslationCache>> {
    let config_file = ConfigManager::new()?.load_or_default()?;
    open_cache(config_file.cache.options())
}

pub fn print_stats() -> Result<()> {
    let cache = configured_cache()?;
    let options = cache.options();

    println!("{}", Style::header("Translation cache"));
    println!(
        "  {}  {}",
        Style::label("Location:"),
        Style::secondary(paths::cache_dir()?.display().to_string())
    );
    println!(
        "  {}   {} / {}",
        Style::label("Entries:"),
        Style::value(cache.len()),
        options.max_size
    );

    Ok(())
}

pub fn clear() -> Result<()> {
    let cache = configured_cache()?;
    let removed = cache.len();
    cache.clear();

    println!(
        "{} Removed {removed} cached translation{}",
        Style::success("✓"),
        if removed == 1 { "" } else { "s" }
    );
    Ok(())
}
