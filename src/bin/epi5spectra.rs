use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spectra::args::CLIArgs;
use spectra::{epicollect, runner, VERSION};

const NAME: &str = "epi5spectra";

#[derive(Debug, Parser)]
#[command(name = NAME, about = "Epicollect5 StreetSpectra tool", version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Epicollect5 entries commands
    Entries(CLIArgs<epicollect::EntriesArgs>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let argv = match runner::bootstrap(NAME) {
        Ok(argv) => argv,
        Err(code) => return code,
    };
    let cli = Cli::parse_from(argv);

    match cli.command {
        Commands::Entries(cmd) => runner::execute(NAME, &cmd.base, epicollect::run(cmd.args)).await,
    }
}
