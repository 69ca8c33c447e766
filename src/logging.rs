//! Tracing subscriber setup for gamehub.
//!
//! `RUST_LOG` takes precedence over `[logging] level`. Without
//! `[logging] file` only the console is written; with it every line is also
//! appended to that file.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::{GamehubError, Result};

/// Parse the configured filter directives, e.g. `info` or `warn,gamehub=debug`.
fn directives(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| GamehubError::Config(format!("invalid logging.level {level:?}: {e}")))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber.
///
/// Fails on a bad level, an unwritable log file, or when a subscriber is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| directives(&config.level))?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match &config.file {
        None => registry.with(fmt::layer().with_target(true)).try_init(),
        Some(path) => {
            let file = Arc::new(open_log_file(Path::new(path))?);
            registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stdout.and(file))
                        .with_ansi(false)
                        .with_target(true),
                )
                .try_init()
        }
    };

    installed.map_err(|e| GamehubError::Config(format!("cannot install logger: {e}")))
}
