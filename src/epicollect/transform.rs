use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use tracing::instrument;

use crate::epicollect::api::raw_entries;
use crate::epicollect::remap::remap_entries;
use crate::epicollect::schema::FormSelection;
use crate::files::{read_json_file, write_json_file, JsonStyle};
use crate::observation::Observation;
use crate::utils::pluralize;

#[derive(Debug, Clone, Args)]
pub struct TransformArgs {
    /// Raw Epicollect5 export
    #[arg(short = 'i', long)]
    pub input_file: PathBuf,

    /// Canonical observations output
    #[arg(short = 'o', long)]
    pub output_file: PathBuf,

    /// Form layout of the input entries
    #[arg(long, value_enum, default_value_t = FormSelection::Auto)]
    pub form: FormSelection,
}

#[instrument(name = "transform", skip_all, fields(input = %args.input_file.display()))]
pub fn run(args: TransformArgs) -> Result<()> {
    let document: Value = read_json_file(&args.input_file)?;
    let entries = raw_entries(document)
        .with_context(|| format!("unexpected layout in {}", args.input_file.display()))?;

    let observations: Vec<Observation> = remap_entries(entries, args.form)
        .collect::<Result<_, _>>()
        .with_context(|| format!("failed to remap {}", args.input_file.display()))?;

    write_json_file(&args.output_file, &observations, JsonStyle::Pretty)?;
    tracing::info!(
        "{} {} written to {}",
        observations.len(),
        pluralize(observations.len(), "observation", None),
        args.output_file.display()
    );
    Ok(())
}
