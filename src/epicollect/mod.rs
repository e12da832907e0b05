//! `epi5spectra entries`: pull StreetSpectra entries out of Epicollect5 and
//! turn them into canonical observations.

use anyhow::Result;
use clap::{Args, Subcommand};


pub mod api;
mod export;
pub mod remap;
pub mod schema;
mod transform;

pub use export::ExportArgs;
pub use transform::TransformArgs;

#[derive(Debug, Clone, Args)]
pub struct EntriesArgs {
    #[command(subcommand)]
    command: EntriesCommands,
}

#[derive(Debug, Clone, Subcommand)]
enum EntriesCommands {
    /// Export entries from an Epicollect5 project to a JSON file
    Export(ExportArgs),
    /// Remap a raw Epicollect5 export into canonical observations
    Transform(TransformArgs),
}

pub async fn run(args: EntriesArgs) -> Result<()> {
    match args.command {
        EntriesCommands::Export(args) => export::run(args).await,
        EntriesCommands::Transform(args) => transform::run(args),
    }
}
