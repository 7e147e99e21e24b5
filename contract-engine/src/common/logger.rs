//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production
//! environments:
//! - console layer (pretty in development, JSON in production)
//! - optional daily rotating file layer under `<log_dir>/app/`

use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, prelude::*, EnvFilter};

/// Initialize the logging system.
///
/// # Arguments
/// * `level` - Default log level when `RUST_LOG` is unset (e.g. "info")
/// * `json_format` - JSON output (production) vs human-readable (development)
/// * `log_dir` - Optional directory for the rotating file layer
///
/// Returns the appender guard; dropping it stops the background writer, so
/// the caller must hold it for the process lifetime.
pub fn init_logger(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer_parts = match log_dir {
        Some(dir) => {
            let app_dir = Path::new(dir).join("app");
            fs::create_dir_all(&app_dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, app_dir, "app.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };
    let (file_writer, guard) = file_layer_parts;

    let console_layer = if json_format {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .boxed()
    });

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer);

    // A test harness may have installed a subscriber already
    if registry.try_init().is_err() {
        tracing::debug!("Global subscriber already set, keeping existing one");
    }

    Ok(guard)
}
