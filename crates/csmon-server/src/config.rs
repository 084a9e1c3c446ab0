use csmon_upstream::UpstreamConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_API_TOKEN: &str = "METRONOME_API_TOKEN";
pub const ENV_BASE_URL: &str = "METRONOME_API_BASE_URL";
pub const ENV_CUSTOMER_ID: &str = "METRONOME_CUSTOMER_ID";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Allowed CORS origins. Empty allows any origin (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            upstream: UpstreamConfig::default(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults. Environment
    /// overrides are applied in both cases.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            tracing::warn!(path, "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Let `METRONOME_*` variables take precedence over the file. Blank
    /// values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.upstream.api_token = Some(token);
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.upstream.base_url = base_url;
        }
        if let Some(customer_id) = lookup(ENV_CUSTOMER_ID) {
            self.upstream.customer_id = Some(customer_id);
        }
    }
}
