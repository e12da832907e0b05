//! `actiontool observations`: move canonical observations in and out of the
//! ACTION observations database.

use anyhow::Result;
use clap::{Args, Subcommand};


pub mod api;
mod download;
mod upload;

pub use download::DownloadArgs;
pub use upload::UploadArgs;

#[derive(Debug, Clone, Args)]
pub struct ObservationsArgs {
    #[command(subcommand)]
    command: ObservationsCommands,
}

#[derive(Debug, Clone, Subcommand)]
enum ObservationsCommands {
    /// Download observations from the ACTION database to a JSON file
    Download(DownloadArgs),
    /// Upload observations from a JSON file to the ACTION database
    Upload(UploadArgs),
}

/// Credentials and endpoint shared by every ACTION command.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// ACTION database token
    #[arg(short = 't', long, env = "ACTION_TOKEN", hide_env_values = true)]
    pub token: String,

    /// ACTION API base URL
    #[arg(long, env = "ACTION_API_URL", default_value = api::DEFAULT_API_URL)]
    pub api_url: String,
}

pub async fn run(args: ObservationsArgs) -> Result<()> {
    match args.command {
        ObservationsCommands::Download(args) => download::run(args).await,
        ObservationsCommands::Upload(args) => upload::run(args).await,
    }
}
