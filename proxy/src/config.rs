use concierge_core::config::ProxyConfig as CoreProxyConfig;
use concierge_core::client::{DEFAULT_API_BASE_URL, DEFAULT_MODEL_NAME};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Resolved proxy settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxySettings {
    /// Server-held credential; requests fail with a configuration error
    /// while it is missing
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model_name: String,
    pub api_base_url: String,
    pub http_bind_addr: String,
    pub log_level: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ProxySettings {
    /// Credential, if one is configured and non-empty
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

impl From<&CoreProxyConfig> for ProxySettings {
    fn from(config: &CoreProxyConfig) -> Self {
        let mut settings = Self::default();

        // Only overwrite if the fields are present in the core config
        if let Some(api_key) = &config.api_key {
            settings.api_key = Some(api_key.clone());
        }
        if let Some(model_name) = &config.model_name {
            settings.model_name = model_name.clone();
        }
        if let Some(api_base_url) = &config.api_base_url {
            settings.api_base_url = api_base_url.clone();
        }
        if let Some(addr) = &config.http_bind_addr {
            settings.http_bind_addr = addr.clone();
        }
        if let Some(level) = &config.log_level {
            settings.log_level = level.clone();
        }

        settings
    }
}
