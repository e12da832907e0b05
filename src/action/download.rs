use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use futures_util::TryStreamExt;
use serde_json::Value;
use tracing::instrument;

use super::api::{self, ActionSession, ObservationQuery, DEFAULT_LIMIT, DEFAULT_PAGE_SIZE};
use super::ConnectionArgs;
use crate::args::DateRangeArgs;
use crate::files::{write_json_file, JsonStyle};
use crate::session::DEFAULT_TPS;
use crate::utils::pluralize;

#[derive(Debug, Clone, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output JSON file where to save observations
    #[arg(short = 'f', long)]
    pub file: PathBuf,

    /// Project whose observations are downloaded
    #[arg(short = 'p', long)]
    pub project: String,

    #[command(flatten)]
    pub range: DateRangeArgs,

    /// Maximum number of observations to download
    #[arg(short = 'l', long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Page size for individual HTTP requests
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Requests per second
    #[arg(long, default_value_t = DEFAULT_TPS)]
    pub tps: f64,
}

#[instrument(name = "download", skip_all, fields(project = %args.project))]
pub async fn run(args: DownloadArgs) -> Result<()> {
    tracing::info!("downloading observations to {}", args.file.display());
    let session = ActionSession::open(
        &args.connection.api_url,
        &args.connection.token,
        args.page_size,
        args.tps,
    )?;
    let query = ObservationQuery {
        project: args.project.clone(),
        start: args.range.start_date,
        end: args.range.end_date,
        limit: args.limit,
    };

    let observations: Vec<Value> = api::observations_pager(&session, &query)
        .into_stream()
        .try_collect()
        .await
        .context("failed to download observations from the ACTION database")?;
    tracing::info!(
        "fetched {} {}",
        observations.len(),
        pluralize(observations.len(), "observation", None)
    );

    write_json_file(&args.file, &observations, JsonStyle::Compact)?;
    tracing::info!("written to {}", args.file.display());
    Ok(())
}
