use std::env;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Directory for an additional log file
pub const LOG_DIR_ENV: &str = "DREAMBANK_LOG_DIR";

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "dreambank=info" } else { "dreambank=warn" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

// Initialize tracing-subscriber and return the file writer guard, if any.
// The guard must live until the end of main so buffered lines get flushed.
pub fn init_tracing_subscriber(verbose: bool) -> Option<WorkerGuard> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(verbose));

    let (file_layer, guard) = match env::var_os(LOG_DIR_ENV).map(PathBuf::from) {
        Some(log_dir) => {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "dreambank.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(env_filter(true));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
