//! Subscriber setup for the binaries.
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// File the daemon logs to inside the workdir.
pub const DAEMON_LOG_FILE: &str = "mnpd.log";

fn filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "info" } else { "warn" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Log to stderr. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(verbose));
    // a second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(stderr).try_init();
}

/// Log to stderr and to `{workdir}/mnpd.log`. Keep the guard alive until
/// exit or buffered lines are lost.
#[cfg(feature = "cli")]
pub fn init_daemon(
    verbose: bool,
    workdir: &std::path::Path,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(workdir.join(DAEMON_LOG_FILE))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    let file = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter(verbose));
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(verbose));
    let _ = tracing_subscriber::registry().with(file).with(stderr).try_init();
    Ok(guard)
}
