use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name of the persisted agent configuration, kept beside the executable.
pub const CONFIG_FILE_NAME: &str = "sysmon_config.json";

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Persisted agent identity and behaviour knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(rename = "server")]
    pub server_url: String,
    #[serde(rename = "interval")]
    pub interval_secs: u64,
    pub device_id: String,
    pub verbose: bool,
}

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub interval_secs: Option<u64>,
    pub device_id: Option<String>,
    pub verbose: bool,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.server_url.is_none()
            && self.interval_secs.is_none()
            && self.device_id.is_none()
            && !self.verbose
    }
}

/// Outcome of resolving the configuration for one run.
#[derive(Debug)]
pub struct Resolved {
    pub config: AgentConfig,
    /// True when CLI overrides were written back to the file.
    pub persisted_overrides: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            device_id: new_device_id(),
            verbose: false,
        }
    }
}

impl AgentConfig {
    /// Load the configuration file, recreating it with defaults (and a fresh
    /// device id) when it is missing, unparsable or incomplete.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        match Self::from_file(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %path.display(), "Writing default configuration: {e:#}");
                let config = Self::default();
                config.save(path)?;
                Ok(config)
            }
        }
    }

    /// Read and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: AgentConfig = serde_json::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        if config.device_id.trim().is_empty() {
            anyhow::bail!("device_id is empty");
        }
        if config.interval_secs == 0 {
            anyhow::bail!("interval must be greater than zero");
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("cannot write config to {}", path.display()))
    }

    /// Apply CLI overrides on top of the file layer.
    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(ref server) = overrides.server_url {
            self.server_url = server.clone();
        }
        if let Some(interval) = overrides.interval_secs {
            self.interval_secs = interval;
        }
        if let Some(ref id) = overrides.device_id {
            self.device_id = id.clone();
        }
        if overrides.verbose {
            self.verbose = true;
        }
        self
    }

    /// Resolve defaults → file → CLI, persisting the result only when the CLI
    /// changed something.
    pub fn resolve(path: &Path, overrides: &Overrides) -> Result<Resolved> {
        let config = Self::load_or_create(path)?.apply(overrides);
        let persisted_overrides = !overrides.is_empty();
        if persisted_overrides {
            config.save(path)?;
        }
        Ok(Resolved {
            config,
            persisted_overrides,
        })
    }

    /// Replace the device id with a freshly generated one and persist it.
    pub fn regenerate_id(&mut self, path: &Path) -> Result<()> {
        self.device_id = new_device_id();
        self.save(path)
    }
}

/// Generate a new random device identifier.
pub fn new_device_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Default config location: beside the running executable, falling back to
/// the working directory.
pub fn default_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}
