use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spectra::args::CLIArgs;
use spectra::{action, runner, VERSION};

const NAME: &str = "actiontool";

#[derive(Debug, Parser)]
#[command(name = NAME, about = "ACTION observations database tool", version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// ACTION database observation commands
    Observations(CLIArgs<action::ObservationsArgs>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let argv = match runner::bootstrap(NAME) {
        Ok(argv) => argv,
        Err(code) => return code,
    };
    let cli = Cli::parse_from(argv);

    match cli.command {
        Commands::Observations(cmd) => runner::execute(NAME, &cmd.base, action::run(cmd.args)).await,
    }
}
