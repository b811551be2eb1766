use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingSettings;
use crate::error::{AppError, AppResult};

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(settings: &LoggingSettings) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|err| {
            AppError::Configuration(format!("invalid log level '{}': {err}", settings.level))
        })?;

    let file_layer = match &settings.file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|err| AppError::Configuration(format!("logging already initialised: {err}")))
}

fn open_log_file(path: &std::path::Path) -> AppResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            AppError::Configuration(format!(
                "cannot open log file {}: {err}",
                path.display()
            ))
        })
}
