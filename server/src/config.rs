use anyhow::{Context, Result};
use serde::Deserialize;

/// Collector configuration loaded from a TOML file or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Origins allowed to call the API from a browser. Empty allows any.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// `limit` applied to history queries that omit it.
    #[serde(default = "default_history_limit")]
    pub default_history_limit: usize,

    /// `hours` applied to history queries that omit it.
    #[serde(default = "default_history_hours")]
    pub default_history_hours: u64,
}

fn default_history_limit() -> usize {
    100
}

fn default_history_hours() -> u64 {
    24
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            default_history_limit: default_history_limit(),
            default_history_hours: default_history_hours(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::de::from_str(contents)?;
        Ok(config)
    }
}
