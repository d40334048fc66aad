//! Application configuration for LLMO Writer.
//!
//! User config lives at `~/.llmo/llmo.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LlmoError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "llmo.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".llmo";

// ---------------------------------------------------------------------------
// Config structs (matching llmo.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Target article length in characters.
    #[serde(default = "default_target_length")]
    pub target_length: u32,

    /// How many title candidates to ask for.
    #[serde(default = "default_title_count")]
    pub title_count: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            target_length: default_target_length(),
            title_count: default_title_count(),
        }
    }
}

fn default_target_length() -> u32 {
    400
}
fn default_title_count() -> u32 {
    5
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for titles, articles, and rewrites.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for search-grounded generation.
    #[serde(default = "default_grounded_model")]
    pub grounded_model: String,

    /// API origin.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            grounded_model: default_grounded_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    "models/gemini-2.5-flash-lite".into()
}
fn default_grounded_model() -> String {
    "models/gemini-2.5-pro".into()
}
fn default_base_url() -> Url {
    Url::parse("https://generativelanguage.googleapis.com").expect("static base URL")
}
fn default_timeout_secs() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.llmo/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| LlmoError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.llmo/llmo.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LlmoError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LlmoError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LlmoError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| LlmoError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LlmoError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the Gemini API key from the configured env var.
///
/// A missing or empty key is a startup-fatal [`LlmoError::Config`].
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.gemini.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(LlmoError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/apikey"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("target_length"));
        assert!(toml_str.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[gemini]
model = "models/gemini-pro-latest"
timeout_secs = 30
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.gemini.model, "models/gemini-pro-latest");
        assert_eq!(config.gemini.timeout_secs, 30);
        assert_eq!(config.gemini.grounded_model, "models/gemini-2.5-pro");
        assert_eq!(config.defaults.target_length, 400);
        assert_eq!(config.defaults.title_count, 5);
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let dir = std::env::temp_dir().join(format!("llmo-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("bad.toml");
        std::fs::write(&path, "[gemini]\nbase_url = \"not a url\"\n").expect("write");

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, LlmoError::Config { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn api_key_missing_is_fatal() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.gemini.api_key_env = "LLMO_TEST_NONEXISTENT_KEY_12345".into();
        let err = resolve_api_key(&config).unwrap_err();
        assert!(err.to_string().contains("API key not found"));
        assert_eq!(err.severity(), crate::Severity::Fatal);
    }
}
