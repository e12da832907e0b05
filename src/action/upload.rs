use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Map, Value};
use tracing::instrument;

use super::api::{ActionSession, DEFAULT_PAGE_SIZE};
use super::ConnectionArgs;
use crate::files::read_json_file;
use crate::session::DEFAULT_TPS;
use crate::upload::upload_each;
use crate::utils::pluralize;

#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Input JSON file with an array of observation objects
    #[arg(short = 'f', long)]
    pub file: PathBuf,

    /// Requests per second
    #[arg(long, default_value_t = DEFAULT_TPS)]
    pub tps: f64,
}

#[instrument(name = "upload", skip_all, fields(file = %args.file.display()))]
pub async fn run(args: UploadArgs) -> Result<()> {
    // Records go out untouched apart from `written_at`, whatever produced them.
    let observations: Vec<Map<String, Value>> = read_json_file(&args.file)?;
    tracing::info!(
        "parsed {} {} from {}",
        observations.len(),
        pluralize(observations.len(), "observation", None),
        args.file.display()
    );

    let session = ActionSession::open(
        &args.connection.api_url,
        &args.connection.token,
        DEFAULT_PAGE_SIZE,
        args.tps,
    )?;
    let mut throttle = session.throttle();
    let written = upload_each(&session.client, &session.url, observations, &mut throttle)
        .await
        .context("failed to upload observations to the ACTION database")?;
    tracing::info!(
        "uploaded {written} {}",
        pluralize(written, "observation", None)
    );
    Ok(())
}
