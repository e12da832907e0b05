use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use futures_util::TryStreamExt;
use serde_json::Value;
use tracing::instrument;

use crate::args::DateRangeArgs;
use crate::epicollect::api::{self, EntriesQuery, DEFAULT_PAGE_SIZE};
use crate::epicollect::remap::remap_entries;
use crate::epicollect::schema::FormSelection;
use crate::files::{write_json_file, JsonStyle};
use crate::observation::Observation;
use crate::session::{Pacing, DEFAULT_TPS};
use crate::utils::pluralize;

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Epicollect5 project slug
    #[arg(long, default_value = "street-spectra")]
    pub slug: String,

    /// Output JSON file
    #[arg(short = 'f', long)]
    pub file: PathBuf,

    #[command(flatten)]
    pub range: DateRangeArgs,

    /// Entries requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Requests per second
    #[arg(long, default_value_t = DEFAULT_TPS)]
    pub tps: f64,

    /// Write canonical observations instead of raw entries
    #[arg(long)]
    pub transform: bool,

    /// Form layout used by --transform
    #[arg(long, value_enum, default_value_t = FormSelection::Auto)]
    pub form: FormSelection,

    /// Bearer token for private projects
    #[arg(long, env = "EPICOLLECT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Epicollect5 API base URL
    #[arg(long, env = "EPICOLLECT_API_URL", default_value = api::DEFAULT_API_URL)]
    pub api_url: String,
}

#[instrument(name = "export", skip_all, fields(slug = %args.slug))]
pub async fn run(args: ExportArgs) -> Result<()> {
    let pacing = Pacing::new(args.page_size, args.tps)?;
    let client = api::connect(&args.api_url, args.token.as_deref())?;
    let query = EntriesQuery {
        slug: args.slug.clone(),
        start: args.range.start_date,
        end: args.range.end_date,
        page_size: pacing.page_size,
    };
    tracing::info!(
        from = %query.start,
        to = %query.end,
        "exporting Epicollect5 entries"
    );

    let entries: Vec<Value> = api::entries_pager(client, &query, pacing.throttle())?
        .into_stream()
        .try_collect()
        .await
        .with_context(|| format!("failed to export entries of project '{}'", args.slug))?;
    tracing::info!(
        "fetched {} {}",
        entries.len(),
        pluralize(entries.len(), "entry", Some("entries"))
    );

    if args.transform {
        let observations: Vec<Observation> = remap_entries(entries, args.form)
            .collect::<Result<_, _>>()
            .context("failed to remap exported entries")?;
        write_json_file(&args.file, &observations, JsonStyle::Pretty)?;
    } else {
        write_json_file(&args.file, &entries, JsonStyle::Compact)?;
    }
    tracing::info!("written to {}", args.file.display());
    Ok(())
}
