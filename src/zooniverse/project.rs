use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;
use tracing::instrument;

use super::api::{self, Classification, Project, SubjectSet, Workflow};
use super::export::{self, ExportRequest};
use super::{join_words, percentage, Credentials, ProjectRef, DEFAULT_LANGUAGE};
use crate::files::{write_json_file, JsonStyle};
use crate::ui::{header, print_command_status, styled_table, CommandStatus};
use crate::utils::pluralize;

const DEFAULT_TIMEOUT_SECS: u64 = 20 * 60;
const EXPORT_POLL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    command: ProjectCommands,
}

#[derive(Debug, Clone, Subcommand)]
enum ProjectCommands {
    /// Show a project with its workflows and subject sets
    Find(FindArgs),
    /// Create a new project
    Create(CreateArgs),
    /// Export project classifications from the Zooniverse CSV export
    Export(ExportArgs),
    /// Dump project classifications through the API
    Classifications(ClassificationsArgs),
}

#[derive(Debug, Clone, Args)]
struct FindArgs {
    #[command(flatten)]
    credentials: Credentials,
    #[command(flatten)]
    project: ProjectRef,
}

#[derive(Debug, Clone, Args)]
struct CreateArgs {
    #[command(flatten)]
    credentials: Credentials,

    /// Project name
    #[arg(short = 'n', long, num_args = 1.., required = true)]
    name: Vec<String>,

    /// Project description
    #[arg(short = 'd', long, num_args = 1.., required = true)]
    description: Vec<String>,

    /// Make the project private
    #[arg(long)]
    private: bool,

    /// Primary language
    #[arg(short = 'l', long, default_value = DEFAULT_LANGUAGE)]
    language: String,
}

#[derive(Debug, Clone, Args)]
struct ExportArgs {
    #[command(flatten)]
    credentials: Credentials,
    #[command(flatten)]
    project: ProjectRef,

    /// Output JSON file
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Generate a new export instead of downloading the last one
    #[arg(short = 'g', long)]
    generate: bool,

    /// Wait for an in-progress export to finish
    #[arg(short = 'w', long)]
    wait: bool,

    /// Wait timeout in seconds
    #[arg(short = 't', long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

#[derive(Debug, Clone, Args)]
struct ClassificationsArgs {
    #[command(flatten)]
    credentials: Credentials,
    #[command(flatten)]
    project: ProjectRef,

    /// Output JSON file
    #[arg(short = 'f', long)]
    file: PathBuf,
}

pub async fn run(args: ProjectArgs) -> Result<()> {
    match args.command {
        ProjectCommands::Find(args) => find(args).await,
        ProjectCommands::Create(args) => create(args).await,
        ProjectCommands::Export(args) => export_classifications(args).await,
        ProjectCommands::Classifications(args) => classifications(args).await,
    }
}

#[instrument(name = "project_find", skip_all, fields(project = %args.project.project))]
async fn find(args: FindArgs) -> Result<()> {
    let zooniverse = args.credentials.login().await?;
    let project = zooniverse.project(&args.project.project).await?;
    tracing::info!(
        "project id: {}, display_name: {}, private: {}, primary_language: {}",
        project.id,
        project.display_name,
        project.private,
        project.primary_language.as_deref().unwrap_or("-")
    );

    let mut table = styled_table();
    table.set_header(vec![
        header("Workflow"),
        header("Name"),
        header("Retired"),
        header("Subject sets"),
    ]);
    let workflows: Vec<Workflow> = zooniverse.by_ids(&project.links.workflows).await?;
    for workflow in &workflows {
        let retired = workflow.retired_set_member_subjects_count;
        let total = workflow.subjects_count;
        tracing::info!(
            "workflow {} '{}' subject stats = {retired} / {total} ({}%)",
            workflow.id,
            workflow.display_name,
            percentage(retired, total)
        );
        let sets: Vec<SubjectSet> = zooniverse.by_ids(&workflow.links.subject_sets).await?;
        for set in &sets {
            tracing::info!("workflow subject set {}: {}", set.id, set.display_name);
        }
        let set_names: Vec<&str> = sets.iter().map(|s| s.display_name.as_str()).collect();
        table.add_row(vec![
            workflow.id.clone(),
            workflow.display_name.clone(),
            format!("{retired}/{total} ({}%)", percentage(retired, total)),
            set_names.join(", "),
        ]);
    }
    println!("{table}");
    Ok(())
}

#[instrument(name = "project_create", skip_all)]
async fn create(args: CreateArgs) -> Result<()> {
    let zooniverse = args.credentials.login().await?;
    let name = join_words(&args.name);
    let body = json!({
        "display_name": name,
        "description": join_words(&args.description),
        "primary_language": args.language,
        "private": args.private,
    });
    match api::create::<Project>(zooniverse.api(), body).await {
        Ok(project) => {
            tracing::info!("created project {} ({})", project.id, project.display_name);
            print_command_status(
                CommandStatus::Success,
                &format!("Created project '{}' with id {}", project.display_name, project.id),
            );
            Ok(())
        }
        Err(err) => {
            print_command_status(CommandStatus::Error, &format!("Failed to create '{name}'"));
            Err(err)
        }
    }
}

#[instrument(name = "project_export", skip_all, fields(project = %args.project.project))]
async fn export_classifications(args: ExportArgs) -> Result<()> {
    let zooniverse = args.credentials.login().await?;
    let project = zooniverse.project(&args.project.project).await?;
    tracing::info!("exporting project classifications, this may take a while");
    let request = ExportRequest {
        generate: args.generate,
        wait: args.wait,
        timeout: Duration::from_secs(args.timeout),
        poll_every: EXPORT_POLL,
    };
    let rows = export::classification_rows(zooniverse.api(), &project.id, request).await?;
    write_json_file(&args.file, &rows, JsonStyle::Pretty)?;
    tracing::info!(
        "written {} {} to {}",
        rows.len(),
        pluralize(rows.len(), "classification", None),
        args.file.display()
    );
    Ok(())
}

#[instrument(name = "project_classifications", skip_all, fields(project = %args.project.project))]
async fn classifications(args: ClassificationsArgs) -> Result<()> {
    let zooniverse = args.credentials.login().await?;
    let project = zooniverse.project(&args.project.project).await?;
    let classifications: Vec<Classification> =
        zooniverse.list(&[("project_id", project.id.as_str())]).await?;
    for classification in &classifications {
        tracing::debug!(id = %classification.id, "classification");
    }
    write_json_file(&args.file, &classifications, JsonStyle::Pretty)?;
    tracing::info!(
        "written {} {} to {}",
        classifications.len(),
        pluralize(classifications.len(), "classification", None),
        args.file.display()
    );
    Ok(())
}
