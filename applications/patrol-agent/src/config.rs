/// Agent configuration
use crate::error::{AgentError, Result};
use patrol_server_client::ClientConfig;
use patrol_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Read from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "patrol.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Empty means no server configured; only offline commands work
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub access_token: Option<String>,

    /// Generated once and kept in the local database when not set
    #[serde(default)]
    pub device_id: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl AgentConfig {
    /// Load configuration from file and environment.
    ///
    /// An explicit `path` must exist; otherwise `patrol.toml` is used if
    /// present. `PATROL_`-prefixed variables override both, with `__`
    /// between section and key (`PATROL_SYNC__INTERVAL_SECS=30`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("PATROL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AgentError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.trim().is_empty() {
            return Err(AgentError::Config("storage.database_url is required".into()));
        }
        if self.server.probe_interval_secs == 0 {
            return Err(AgentError::Config(
                "server.probe_interval_secs must be greater than 0".into(),
            ));
        }
        self.sync.validate()?;
        Ok(())
    }

    /// Server settings for commands that talk to the network
    pub fn require_server(&self) -> Result<&ServerSettings> {
        if self.server.base_url.trim().is_empty() {
            return Err(AgentError::Config(
                "server.base_url is required (set PATROL_SERVER__BASE_URL)".into(),
            ));
        }
        Ok(&self.server)
    }
}

impl ServerSettings {
    pub fn client_config(&self, device_id: impl Into<String>) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            access_token: self.access_token.clone(),
            device_id: device_id.into(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

// Default values
fn default_database_url() -> String {
    "sqlite://./data/patrol.db".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    5
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: None,
            device_id: None,
            request_timeout_secs: default_request_timeout_secs(),
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}
