// Logging module - Logging infrastructure
use crate::domain::error::{SerialTermError, SerialTermResult};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when nothing else asks for one. Kept quiet so diagnostics do not
/// interleave with the device output on the terminal.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

fn default_directive(level: &str) -> String {
    format!("serialterm={}", level.trim().to_ascii_lowercase())
}

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over `level`. With `log_file` set, events are
/// appended to that file instead of stderr.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> SerialTermResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SerialTermError::Config {
                    message: format!("Failed to open log file {}: {}", path.display(), e),
                })?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true)
                        .with_level(true)
                        .with_thread_ids(true),
                )
                .try_init()
        }
        None => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_level(true),
            )
            .try_init(),
    };

    result.map_err(|e| SerialTermError::Config {
        message: format!("Failed to initialize logging: {}", e),
    })?;

    tracing::debug!("SerialTerm logging system initialized");
    Ok(())
}
