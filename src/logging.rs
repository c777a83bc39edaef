//! Sets up `tracing` output for applications that embed the ledger.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global subscriber that logs to stdout and, optionally, to a file.
///
/// Stdout receives `INFO` and above, the log file receives `DEBUG` and above.
/// `RUST_LOG` narrows both further if it is set.
///
/// # Errors
/// Returns an error if the log file cannot be opened. Calling this function
/// when a global subscriber is already installed is a no-op.
pub fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(filter::LevelFilter::INFO);

    let file_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(filter::LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_log)
        .with(file_log)
        .try_init()
        .is_err()
    {
        tracing::debug!("A global tracing subscriber is already installed.");
    }

    Ok(())
}
