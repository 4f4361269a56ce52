use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::cache::CacheOptions;
use crate::hotkey::HotkeyId;
use crate::paths;
use crate::translation::{CODE_PROMPT, DEFAULT_PROMPT, LanguageInfo, language};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SKILL: &str = "general";
pub const DEFAULT_TARGET: &str = "English";

/// Default settings in the `[seltl]` section of config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeltlConfig {
    /// Default provider name.
    pub provider: Option<String>,
    /// Default model name.
    pub model: Option<String>,
    /// Default skill (prompt template) name.
    pub skill: Option<String>,
    /// Configured target language, by English or native name.
    pub to: Option<String>,
}

/// Configuration for a translation provider.
///
/// Each provider has a base URL and optional API key settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The OpenAI-compatible API base URL, e.g. `https://api.openai.com/v1/`.
    pub base_url: String,
    /// API key stored directly in config (not recommended).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable name containing the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// List of available models for this provider.
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderConfig {
    /// Gets the API key, preferring environment variable over config file.
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env
            && let Ok(key) = std::env::var(env_var)
            && !key.is_empty()
        {
            return Some(key);
        }
        self.api_key.clone()
    }

    fn builtin() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            models: vec![DEFAULT_MODEL.to_string()],
        }
    }
}

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillConfig {
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    pub key: HotkeyId,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

/// The `[hotkeys]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeysConfig {
    pub translate: HotkeyConfig,
    pub append: HotkeyConfig,
}

impl Default for HotkeysConfig {
    fn default() -> Self {
        Self {
            translate: HotkeyConfig {
                key: HotkeyId::Primary,
                enabled: true,
            },
            append: HotkeyConfig {
                key: HotkeyId::Secondary,
                enabled: true,
            },
        }
    }
}

/// The `[cache]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size: usize,
    pub save_frequency: usize,
    pub min_gap_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let options = CacheOptions::default();
        Self {
            max_size: options.max_size,
            save_frequency: options.save_frequency,
            min_gap_ms: u64::try_from(options.min_gap.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl CacheConfig {
    pub const fn options(&self) -> CacheOptions {
        CacheOptions {
            max_size: self.max_size,
            save_frequency: self.save_frequency,
            min_gap: Duration::from_millis(self.min_gap_ms),
        }
    }
}

/// The complete configuration file structure.
///
/// Corresponds to `~/.config/seltl/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Default settings.
    #[serde(default)]
    pub seltl: SeltlConfig,
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// User skills keyed by name; these shadow the built-in ones.
    #[serde(default)]
    pub skills: HashMap<String, SkillConfig>,
    #[serde(default)]
    pub hotkeys: HotkeysConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ConfigFile {
    /// The file `seltl config init` writes: every default spelled out so it
    /// can be edited in place.
    pub fn starter() -> Self {
        Self {
            seltl: SeltlConfig {
                provider: Some(DEFAULT_PROVIDER.to_string()),
                model: Some(DEFAULT_MODEL.to_string()),
                skill: Some(DEFAULT_SKILL.to_string()),
                to: Some(DEFAULT_TARGET.to_string()),
            },
            providers: HashMap::from([(DEFAULT_PROVIDER.to_string(), ProviderConfig::builtin())]),
            ..Self::default()
        }
    }

    /// Looks a provider up, falling back to the built-in `openai` provider.
    pub fn provider(&self, name: &str) -> Option<ProviderConfig> {
        self.providers
            .get(name)
            .cloned()
            .or_else(|| (name == DEFAULT_PROVIDER).then(ProviderConfig::builtin))
    }

    /// All skills, built-in ones first overridden by user ones, sorted by name.
    pub fn skills(&self) -> BTreeMap<String, String> {
        let mut skills = BTreeMap::from([
            (DEFAULT_SKILL.to_string(), DEFAULT_PROMPT.to_string()),
            ("code".to_string(), CODE_PROMPT.to_string()),
        ]);
        for (name, skill) in &self.skills {
            skills.insert(name.clone(), skill.prompt.clone());
        }
        skills
    }
}

/// Resolved configuration after merging CLI arguments and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The selected provider name.
    pub provider_name: String,
    pub base_url: String,
    /// The model to use for translation.
    pub model: String,
    /// Empty when no key is configured; the worker reports it.
    pub api_key: String,
    pub skill_name: String,
    pub prompt_template: String,
    /// The configured target language.
    pub target_language: LanguageInfo,
    pub hotkeys: HotkeysConfig,
    pub cache: CacheOptions,
}

/// Options for resolving configuration.
///
/// Contains CLI overrides that take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Target language override.
    pub to: Option<String>,
    /// Provider name override.
    pub provider: Option<String>,
    /// Model name override.
    pub model: Option<String>,
    /// Skill name override.
    pub skill: Option<String>,
}

/// Resolves configuration by merging CLI options with config file settings.
///
/// CLI options take precedence over config file values, which take
/// precedence over built-in defaults.
///
/// # Errors
///
/// Returns an error if the selected provider or skill does not exist or the
/// target language is not supported. A missing API key is not an error here.
pub fn resolve_config(
    options: &ResolveOptions,
    config_file: &ConfigFile,
) -> Result<ResolvedConfig> {
    let provider_name = pick(
        options.provider.as_deref(),
        config_file.seltl.provider.as_deref(),
        DEFAULT_PROVIDER,
    );

    let provider_config = config_file.provider(&provider_name).ok_or_else(|| {
        let mut available: Vec<_> = config_file.providers.keys().map(String::as_str).collect();
        if !available.contains(&DEFAULT_PROVIDER) {
            available.push(DEFAULT_PROVIDER);
        }
        available.sort_unstable();
        anyhow!(
            "Provider '{provider_name}' not found\n\n\
             Available providers:\n  \
             - {}\n\n\
             Add providers to ~/.config/seltl/config.toml",
            available.join("\n  - ")
        )
    })?;

    if provider_config.base_url.trim().is_empty() {
        bail!("Provider '{provider_name}' has an empty base_url");
    }

    let model = pick(
        options.model.as_deref(),
        config_file.seltl.model.as_deref(),
        DEFAULT_MODEL,
    );

    if !provider_config.models.is_empty() && !provider_config.models.contains(&model) {
        warn!(
            model = %model,
            provider = %provider_name,
            configured = %provider_config.models.join(", "),
            "Model is not in the provider's configured models list, proceeding anyway"
        );
    }

    let skill_name = pick(
        options.skill.as_deref(),
        config_file.seltl.skill.as_deref(),
        DEFAULT_SKILL,
    );
    let mut skills = config_file.skills();
    let prompt_template = skills.remove(&skill_name).ok_or_else(|| {
        let available: Vec<_> = skills.keys().map(String::as_str).collect();
        anyhow!(
            "Skill '{skill_name}' not found\n\n\
             Available skills: {}",
            available.join(", ")
        )
    })?;

    let to = pick(
        options.to.as_deref(),
        config_file.seltl.to.as_deref(),
        DEFAULT_TARGET,
    );
    let target_language = language::validate_language(&to)?;

    Ok(ResolvedConfig {
        api_key: provider_config.get_api_key().unwrap_or_default(),
        base_url: provider_config.base_url,
        provider_name,
        model,
        skill_name,
        prompt_template,
        target_language,
        hotkeys: config_file.hotkeys,
        cache: config_file.cache.options(),
    })
}

fn pick(cli: Option<&str>, file: Option<&str>, default: &str) -> String {
    cli.or(file).unwrap_or(default).to_string()
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager.
    ///
    /// Configuration is stored at `$XDG_CONFIG_HOME/seltl/config.toml`
    /// or `~/.config/seltl/config.toml` if `XDG_CONFIG_HOME` is not set.
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: paths::config_dir()?.join("config.toml"),
        })
    }

    /// A manager for an explicit config file.
    pub fn at(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<ConfigFile> {
        let contents = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config_file: ConfigFile =
            toml::from_str(&contents).with_context(|| "Failed to parse config file")?;

        Ok(config_file)
    }

    pub fn save(&self, config: &ConfigFile) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;

        crate::fs::atomic_write(&self.config_path, &contents).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })
    }

    /// Writes `config` unless a file is already there and `force` is false.
    ///
    /// Returns whether the file was written.
    pub fn init(&self, config: &ConfigFile, force: bool) -> Result<bool> {
        if self.config_path.exists() && !force {
            return Ok(false);
        }
        self.save(config)?;
        Ok(true)
    }

    /// Loads the config file, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(&self) -> Result<ConfigFile> {
        match fs::metadata(&self.config_path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ConfigFile::default()),
            _ => self.load(),
        }
    }
}
