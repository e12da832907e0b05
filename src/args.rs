use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::Args;

use crate::timefmt::parse_cli_date;

#[derive(Debug, Clone, Args)]
pub struct BaseArgs {
    /// Verbose output
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Do not log to console
    #[arg(long, global = true)]
    pub no_console: bool,

    /// Optional log file (appended to)
    #[arg(long, env = "SPECTRA_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to a .env file to load before running commands.
    #[arg(long, env = "SPECTRA_ENV_FILE", hide_env_values = true, global = true)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CLIArgs<T: Args> {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub args: T,
}

#[derive(Debug, Clone, Args)]
pub struct DateRangeArgs {
    /// Start date
    #[arg(
        short = 's',
        long,
        value_name = "YYYY-MM-DD|YYYY-MM-DDTHH:MM:SS",
        value_parser = parse_cli_date,
        default_value = "2019-01-01"
    )]
    pub start_date: NaiveDateTime,

    /// End date
    #[arg(
        short = 'e',
        long,
        value_name = "YYYY-MM-DD|YYYY-MM-DDTHH:MM:SS",
        value_parser = parse_cli_date,
        default_value = "2999-12-31"
    )]
    pub end_date: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Probe {
        #[command(flatten)]
        base: BaseArgs,
        #[command(flatten)]
        range: DateRangeArgs,
    }

    #[test]
    fn date_range_defaults_cover_every_observation() {
        let probe = Probe::try_parse_from(["probe"]).unwrap();
        assert_eq!(probe.range.start_date.to_string(), "2019-01-01 00:00:00");
        assert_eq!(probe.range.end_date.to_string(), "2999-12-31 00:00:00");
        assert!(!probe.base.verbose && !probe.base.quiet);
    }

    #[test]
    fn verbose_and_quiet_are_exclusive() {
        assert!(Probe::try_parse_from(["probe", "-v", "-q"]).is_err());
    }

    #[test]
    fn accepts_full_timestamps() {
        let probe = Probe::try_parse_from(["probe", "-s", "2021-05-01T12:30:00"]).unwrap();
        assert_eq!(probe.range.start_date.to_string(), "2021-05-01 12:30:00");
    }
}
