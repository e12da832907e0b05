use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::args::BaseArgs;

/// Default filter directive for the chosen verbosity.
pub fn level_directive(base: &BaseArgs) -> &'static str {
    if base.verbose {
        "debug"
    } else if base.quiet {
        "warn"
    } else {
        "info"
    }
}

/// Install the process-wide subscriber: stderr unless `--no-console`, plus an
/// append-only file when `--log-file` is given. `RUST_LOG` overrides the level.
pub fn init(base: &BaseArgs) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!(
            "{},hyper=warn,reqwest=warn,rustls=warn",
            level_directive(base)
        ))
    };

    let console = (!base.no_console).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let file = match &base.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("failed to install logger")?;
    Ok(())
}
