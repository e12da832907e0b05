use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spectra::args::CLIArgs;
use spectra::zooniverse::{project, subjectset, workflow};
use spectra::{runner, VERSION};

const NAME: &str = "zoonispectra";

#[derive(Debug, Parser)]
#[command(name = NAME, about = "Zooniverse StreetSpectra tool", version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Zooniverse project commands
    Project(CLIArgs<project::ProjectArgs>),
    /// Zooniverse workflow commands
    Workflow(CLIArgs<workflow::WorkflowArgs>),
    /// Zooniverse subject set commands
    Subjectset(CLIArgs<subjectset::SubjectSetArgs>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let argv = match runner::bootstrap(NAME) {
        Ok(argv) => argv,
        Err(code) => return code,
    };
    let cli = Cli::parse_from(argv);

    match cli.command {
        Commands::Project(cmd) => runner::execute(NAME, &cmd.base, project::run(cmd.args)).await,
        Commands::Workflow(cmd) => runner::execute(NAME, &cmd.base, workflow::run(cmd.args)).await,
        Commands::Subjectset(cmd) => {
            runner::execute(NAME, &cmd.base, subjectset::run(cmd.args)).await
        }
    }
}
