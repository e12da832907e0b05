use std::ffi::OsString;
use std::future::Future;
use std::process::ExitCode;

use crate::args::BaseArgs;
use crate::{env, logging, VERSION};

const INTERRUPTED: u8 = 130;

/// Load env files ahead of argument parsing; returns the raw argv for clap.
pub fn bootstrap(name: &str) -> Result<Vec<OsString>, ExitCode> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    if let Err(err) = env::bootstrap_from_args(&argv) {
        eprintln!("{name}: {err:#}");
        return Err(ExitCode::FAILURE);
    }
    Ok(argv)
}

/// Run one command to completion. Every error ends up here, is logged once
/// and turned into a non-zero exit status; Ctrl-C aborts the command.
pub async fn execute<F>(name: &str, base: &BaseArgs, command: F) -> ExitCode
where
    F: Future<Output = anyhow::Result<()>>,
{
    if let Err(err) = logging::init(base) {
        eprintln!("{name}: {err:#}");
        return ExitCode::FAILURE;
    }
    tracing::info!("============== {name} {VERSION} ==============");

    tokio::select! {
        result = command => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!("Fatal error => {err:#}");
                ExitCode::FAILURE
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::error!("Interrupted by user");
            ExitCode::from(INTERRUPTED)
        }
    }
}
