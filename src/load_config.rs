//! `load_config` module: merges built-in defaults, an optional static YAML file and the
//! process environment into a validated [`Config`].
//!
//! # Sources (lowest to highest precedence)
//! 1. Defaults from [`OutputConfig`] and [`LogConfig`].
//! 2. A static YAML file with no secrets, taken from `$JIRA_HARVEST_CONFIG` or
//!    `./jira-harvest.yaml` when present. Unknown keys (including secret ones) are rejected.
//! 3. Environment variables, after loading a `.env` file if one exists.
//!
//! Secrets (`JIRA_API_TOKEN`, `AZURE_STORAGE_ACCOUNT_KEY`) are only read from the environment.
//!
//! # Errors
//! All errors use `anyhow::Error` with context and are surfaced by `main` before any
//! tracker call is made.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::{Config, LogConfig, OutputConfig, StorageConfig, TrackerConfig};

/// Environment variable naming the static YAML file.
pub const CONFIG_PATH_VAR: &str = "JIRA_HARVEST_CONFIG";
/// Static file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "jira-harvest.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StaticConfig {
    tracker: TrackerSection,
    storage: StorageSection,
    output: OutputSection,
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TrackerSection {
    base_url: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StorageSection {
    account_name: Option<String>,
    container: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OutputSection {
    local_save: Option<bool>,
    cloud_save: Option<bool>,
    save_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingSection {
    enabled: Option<bool>,
    console: Option<bool>,
    log_dir: Option<PathBuf>,
}

/// Load configuration from the real process environment.
pub fn load_config() -> Result<Config> {
    dotenvy::dotenv().ok();
    let explicit = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
    let path = explicit.or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    });
    load_config_from(path.as_deref(), |key| std::env::var(key).ok())
}

/// Load configuration from an optional YAML file and an environment lookup.
pub fn load_config_from<F>(path: Option<&Path>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let yaml = match path {
        Some(path) => {
            info!(config_path = ?path, "Loading configuration from file");
            match fs::read_to_string(path) {
                Ok(content) => Some(content),
                Err(e) => {
                    error!(error = ?e, config_path = ?path, "Failed to read config file");
                    return Err(anyhow::anyhow!(
                        "Failed to read config file {:?}: {}",
                        path,
                        e
                    ));
                }
            }
        }
        None => None,
    };
    config_from_sources(yaml.as_deref(), env)
}

/// Merge a YAML document (if any) with an environment lookup and validate the result.
pub fn config_from_sources<F>(yaml: Option<&str>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let file: StaticConfig = match yaml {
        Some(content) => serde_yaml::from_str(content).context("Failed to parse config YAML")?,
        None => StaticConfig::default(),
    };
    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    let flag = |key: &str| -> Result<Option<bool>> {
        var(key).map(|raw| parse_bool(key, &raw)).transpose()
    };

    let output_defaults = OutputConfig::default();
    let output = OutputConfig {
        local_save: flag("LOCAL_SAVE")?
            .or(file.output.local_save)
            .unwrap_or(output_defaults.local_save),
        cloud_save: flag("CLOUD_SAVE")?
            .or(file.output.cloud_save)
            .unwrap_or(output_defaults.cloud_save),
        save_path: var("SAVE_PATH")
            .map(PathBuf::from)
            .or(file.output.save_path)
            .unwrap_or(output_defaults.save_path),
    };

    let log_defaults = LogConfig::default();
    let logging = LogConfig {
        enabled: flag("ENABLE_LOGGING")?
            .or(file.logging.enabled)
            .unwrap_or(log_defaults.enabled),
        console: flag("CONSOLE_LOG")?
            .or(file.logging.console)
            .unwrap_or(log_defaults.console),
        log_dir: var("LOG_PATH")
            .map(PathBuf::from)
            .or(file.logging.log_dir)
            .unwrap_or(log_defaults.log_dir),
    };

    let tracker = TrackerConfig {
        base_url: var("JIRA_BASE_URL")
            .or(file.tracker.base_url)
            .context("JIRA_BASE_URL is not set")?
            .trim_end_matches('/')
            .to_owned(),
        email: var("USER_EMAIL")
            .or(file.tracker.email)
            .context("USER_EMAIL is not set")?,
        api_token: var("JIRA_API_TOKEN").context("JIRA_API_TOKEN is not set")?,
    };

    let storage = if output.cloud_save {
        Some(StorageConfig {
            account_name: var("AZURE_STORAGE_ACCOUNT_NAME")
                .or(file.storage.account_name)
                .context("CLOUD_SAVE is on but AZURE_STORAGE_ACCOUNT_NAME is not set")?,
            account_key: var("AZURE_STORAGE_ACCOUNT_KEY")
                .context("CLOUD_SAVE is on but AZURE_STORAGE_ACCOUNT_KEY is not set")?,
            container: var("AZURE_CONTAINER_NAME")
                .or(file.storage.container)
                .context("CLOUD_SAVE is on but AZURE_CONTAINER_NAME is not set")?,
            endpoint: var("AZURE_STORAGE_ENDPOINT").or(file.storage.endpoint),
        })
    } else {
        None
    };

    Ok(Config {
        tracker,
        storage,
        output,
        logging,
    })
}

/// Parse a boolean environment value.
pub fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean (true/false), got {other:?}"),
    }
}
