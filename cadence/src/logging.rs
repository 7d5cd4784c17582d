//! Process wide `tracing` setup: colored console output plus an optional plain log file.

use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Filter for the console layer. `RUST_LOG` wins over the configured level when set.
fn console_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(config.console_level.into()).into())
    })
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let console = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_filter(console_filter(config));

    let file = match &config.file {
        Some(path) => {
            let log_file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(log_file))
                    .with_ansi(false)
                    .with_filter(LevelFilter::from_level(config.file_level.into())),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(path) = &config.file {
        tracing::debug!("Logging to {}", path.display());
    }
    Ok(())
}
