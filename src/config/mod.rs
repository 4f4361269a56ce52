mod manager;

pub use manager::{
    CacheConfig, ConfigFile, ConfigManager, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL,
    DEFAULT_PROVIDER, DEFAULT_SKILL, DEFAULT_TARGET, HotkeyConfig, HotkeysConfig, ProviderConfig,
    ResolveOptions, ResolvedConfig, SeltlConfig, SkillConfig, resolve_config,
};
