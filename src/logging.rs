//! Logging setup: one log file per run, optionally mirrored to stdout.
//!
//! Events are emitted with `tracing` everywhere in the crate; this module only decides
//! where they go. With logging disabled no subscriber is installed and every event is
//! dropped.

use std::fs;
use std::io;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Keeps the background log writer alive; drop it last so buffered lines are flushed.
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn is_active(&self) -> bool {
        self._guard.is_some()
    }
}

/// File name for a run started at `started`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("log_{}.log", started.format("%Y-%m-%d_%H-%M-%S"))
}

/// Install the global subscriber described by `config`.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    if !config.enabled {
        return Ok(LogGuard { _guard: None });
    }

    fs::create_dir_all(&config.log_dir).with_context(|| {
        format!(
            "Failed to create log directory {}",
            config.log_dir.display()
        )
    })?;
    let file_name = log_file_name(Local::now());
    let (file_writer, guard) =
        tracing_appender::non_blocking(rolling::never(&config.log_dir, &file_name));

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false);
    let console_layer = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::info!(
        log_file = %config.log_dir.join(&file_name).display(),
        console = config.console,
        "Logging initialised"
    );
    Ok(LogGuard {
        _guard: Some(guard),
    })
}
