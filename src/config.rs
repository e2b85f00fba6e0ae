use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Run configuration. Built once at startup and handed by reference to every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub tracker: TrackerConfig,
    /// Present whenever cloud saving is enabled.
    pub storage: Option<StorageConfig>,
    pub output: OutputConfig,
    pub logging: LogConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub account_name: String,
    pub account_key: String,
    pub container: String,
    /// Blob service endpoint; defaults to the public Azure endpoint for the account.
    pub endpoint: Option<String>,
}

impl StorageConfig {
    pub fn blob_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_owned(),
            None => format!("https://{}.blob.core.windows.net", self.account_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub local_save: bool,
    pub cloud_save: bool,
    /// Root under which the local sink writes `jira/<project id>.json`.
    pub save_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub enabled: bool,
    pub console: bool,
    pub log_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            local_save: true,
            cloud_save: false,
            save_path: PathBuf::from("./data"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console: true,
            log_dir: PathBuf::from("./logs"),
        }
    }
}

// Secrets stay out of Debug output.
impl std::fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("container", &self.container)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            tracker = %self.tracker.base_url,
            local_save = self.output.local_save,
            cloud_save = self.output.cloud_save,
            save_path = %self.output.save_path.display(),
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}
