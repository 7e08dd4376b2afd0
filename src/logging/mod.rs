/*!
 * Logging Module
 * Centralized logging configuration and utilities
 */
pub mod config;
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the non-blocking writers flushing. Hold it until shutdown.
#[must_use = "dropping the guards stops log output"]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

fn default_directives(log_level: &str) -> String {
    format!(
        "agency_cms_backend={},tower_http=debug,axum=debug,sqlx=warn",
        log_level
    )
}

/// Initialize the logging system
pub fn init() -> LogGuards {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let is_production = environment == "production";

    std::fs::create_dir_all("logs").ok();

    // All events
    let (file_writer, file_guard) = non_blocking(rolling::daily("logs", "app.log"));
    // Errors only
    let (error_writer, error_guard) = non_blocking(rolling::daily("logs", "error.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if is_production {
            "info".to_string()
        } else {
            "debug".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&log_level)));

    let error_layer = fmt::layer()
        .json()
        .with_writer(error_writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(error_layer);

    if is_production {
        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber.with(file_layer).with(console_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber.with(file_layer).with(console_layer).init();
    }

    tracing::info!(environment = %environment, "logging initialized");

    LogGuards {
        _guards: vec![file_guard, error_guard, console_guard],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_target_this_crate() {
        let directives = default_directives("info");
        assert!(directives.starts_with("agency_cms_backend=info"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
