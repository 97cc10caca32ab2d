use crate::errors::{GeminiError, GeminiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable holding the server-side credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the unified config location
pub const CONFIG_PATH_ENV: &str = "CONCIERGE_CONFIG";

/// Application directory under the user's config dir
const APP_NAME: &str = "concierge";

/// Configuration shared by every binary of the suite.
///
/// Each section only carries the values present in the file; consumers merge
/// them onto their own defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct UnifiedConfig {
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub cli: CliConfig,
}

/// Storefront widget settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct WidgetConfig {
    pub brand_name: Option<String>,
    pub site_name: Option<String>,
    pub open_hour: Option<u32>,
    pub close_hour: Option<u32>,
    pub last_order: Option<String>,
    pub phone: Option<String>,
    pub off_hours_message: Option<String>,
    pub reservation_success_message: Option<String>,
    pub storage_namespace: Option<String>,
    pub proxy_url: Option<String>,
    pub primary_color: Option<String>,
}

/// Chat proxy settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProxyConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub api_base_url: Option<String>,
    pub http_bind_addr: Option<String>,
    pub log_level: Option<String>,
}

/// Terminal front-end settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CliConfig {
    pub log_level: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub page_file: Option<PathBuf>,
}

impl UnifiedConfig {
    /// Loads the unified config, falling back to defaults when the file is
    /// missing or malformed, then applies environment overrides.
    pub fn load() -> Self {
        let mut config = match get_unified_config_path() {
            Ok(path) => match Self::load_from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Ignoring unreadable config file");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "Could not resolve config path, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        config
    }

    /// Loads an explicitly chosen config file, then applies the same
    /// environment overrides as [`UnifiedConfig::load`]. Unlike `load`, a
    /// malformed file is an error.
    pub fn load_explicit(path: &Path) -> GeminiResult<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> GeminiResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| GeminiError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| GeminiError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> GeminiResult<()> {
        let content = toml::to_string(self)
            .map_err(|e| GeminiError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .map_err(|e| GeminiError::ConfigError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Pulls the credential from the environment (or a `.env` file). The
    /// environment wins over the file.
    pub fn apply_env(&mut self) {
        dotenvy::dotenv().ok();
        if let Ok(key) = env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.proxy.api_key = Some(key);
            }
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir() -> GeminiResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .ok_or_else(|| {
            GeminiError::ConfigError("Could not determine home directory".to_string())
        })?;

    Ok(config_dir.join(APP_NAME))
}

/// Path of the unified config file, honouring `CONCIERGE_CONFIG`
pub fn get_unified_config_path() -> GeminiResult<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(get_default_config_dir()?.join("config.toml"))
}

/// Default directory for persisted widget data (visitor id, profile)
pub fn get_default_data_dir() -> GeminiResult<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .ok_or_else(|| {
            GeminiError::ConfigError("Could not determine data directory".to_string())
        })?;

    Ok(data_dir.join(APP_NAME))
}
