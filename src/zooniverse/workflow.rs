use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use super::api::{self, Subject, SubjectSet, Workflow};
use super::{join_words, percentage, Credentials, ProjectRef, Zooniverse, DEFAULT_LANGUAGE};
use crate::files::{write_json_file, JsonStyle};
use crate::ui::{apply_column_padding, header, styled_table};

#[derive(Debug, Clone, Args)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    command: WorkflowCommands,
}

#[derive(Debug, Clone, Subcommand)]
enum WorkflowCommands {
    /// Create a new workflow in a project
    Create(CreateArgs),
    /// List the active subject sets of every workflow
    Subjectsets(OutputArgs),
    /// Show workflow and subject set completion status
    Completion(OutputArgs),
}

#[derive(Debug, Clone, Args)]
struct CreateArgs {
    #[command(flatten)]
    credentials: Credentials,
    #[command(flatten)]
    project: ProjectRef,

    /// Workflow name
    #[arg(short = 'n', long, num_args = 1.., required = true)]
    name: Vec<String>,

    /// Primary language
    #[arg(short = 'l', long, default_value = DEFAULT_LANGUAGE)]
    language: String,
}

#[derive(Debug, Clone, Args)]
struct OutputArgs {
    #[command(flatten)]
    credentials: Credentials,
    #[command(flatten)]
    project: ProjectRef,

    /// Output JSON file
    #[arg(short = 'f', long)]
    file: PathBuf,
}

#[derive(Debug, Serialize)]
struct WorkflowSubjectSets {
    workflow_id: String,
    subject_sets: Vec<SubjectSetName>,
}

#[derive(Debug, Serialize)]
struct SubjectSetName {
    subjectset_id: String,
    display_name: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Completion {
    pub id: String,
    pub display_name: String,
    pub subjects_count: u64,
    pub retired_count: u64,
    pub percentage: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_sets: Option<Vec<Completion>>,
}

impl Completion {
    pub fn new(id: &str, display_name: &str, retired_count: u64, subjects_count: u64) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            subjects_count,
            retired_count,
            percentage: percentage(retired_count, subjects_count),
            subject_sets: None,
        }
    }
}

pub async fn run(args: WorkflowArgs) -> Result<()> {
    match args.command {
        WorkflowCommands::Create(args) => create(args).await,
        WorkflowCommands::Subjectsets(args) => subject_sets(args).await,
        WorkflowCommands::Completion(args) => completion(args).await,
    }
}

#[instrument(name = "workflow_create", skip_all, fields(project = %args.project.project))]
async fn create(args: CreateArgs) -> Result<()> {
    let zooniverse = args.credentials.login().await?;
    let project = zooniverse.project(&args.project.project).await?;
    let body = json!({
        "display_name": join_words(&args.name),
        "primary_language": args.language,
        "active": true,
        "tasks": {},
        "links": {"project": project.id},
    });
    let workflow: Workflow = api::create(zooniverse.api(), body).await?;
    tracing::info!("created workflow {} ({})", workflow.id, workflow.display_name);

    let project = zooniverse.project(&args.project.project).await?;
    tracing::info!("project workflows: {}", project.links.workflows.join(", "));
    Ok(())
}

#[instrument(name = "workflow_subjectsets", skip_all, fields(project = %args.project.project))]
async fn subject_sets(args: OutputArgs) -> Result<()> {
    let zooniverse = args.credentials.login().await?;
    let project = zooniverse.project(&args.project.project).await?;
    let workflows: Vec<Workflow> = zooniverse.by_ids(&project.links.workflows).await?;

    let mut listing = Vec::with_capacity(workflows.len());
    for workflow in workflows {
        let sets: Vec<SubjectSet> = zooniverse.by_ids(&workflow.links.subject_sets).await?;
        listing.push(WorkflowSubjectSets {
            workflow_id: workflow.id,
            subject_sets: sets
                .into_iter()
                .map(|set| SubjectSetName {
                    subjectset_id: set.id,
                    display_name: set.display_name,
                })
                .collect(),
        });
    }
    write_json_file(&args.file, &listing, JsonStyle::Pretty)?;
    tracing::info!("written to {}", args.file.display());
    Ok(())
}

/// Count the subjects of `set` retired in `workflow`.
async fn subject_set_completion(
    zooniverse: &Zooniverse,
    workflow: &Workflow,
    set: &SubjectSet,
) -> Result<Completion> {
    let subjects: Vec<Subject> = zooniverse.list(&[("subject_set_id", set.id.as_str())]).await?;
    let mut retired = 0u64;
    for subject in &subjects {
        let status = api::subject_status(
            zooniverse.api(),
            &subject.id,
            Some(&workflow.id),
            zooniverse.throttle(),
        )
        .await?;
        if status.is_some_and(|s| s.is_retired()) {
            retired += 1;
        }
    }
    Ok(Completion::new(
        &set.id,
        &set.display_name,
        retired,
        subjects.len() as u64,
    ))
}

#[instrument(name = "workflow_completion", skip_all, fields(project = %args.project.project))]
async fn completion(args: OutputArgs) -> Result<()> {
    let zooniverse = args.credentials.login().await?;
    let project = zooniverse.project(&args.project.project).await?;
    let workflows: Vec<Workflow> = zooniverse.by_ids(&project.links.workflows).await?;

    let mut report = Vec::with_capacity(workflows.len());
    for workflow in &workflows {
        tracing::info!("workflow id: {}, display_name: {}", workflow.id, workflow.display_name);
        let sets: Vec<SubjectSet> = zooniverse.by_ids(&workflow.links.subject_sets).await?;
        let mut per_set = Vec::with_capacity(sets.len());
        for set in &sets {
            per_set.push(subject_set_completion(&zooniverse, workflow, set).await?);
        }
        let mut entry = Completion::new(
            &workflow.id,
            &workflow.display_name,
            workflow.retired_set_member_subjects_count,
            workflow.subjects_count,
        );
        tracing::info!(
            "global completion percentage for workflow '{}' is {}%",
            entry.display_name,
            entry.percentage
        );
        entry.subject_sets = Some(per_set);
        report.push(entry);
    }

    write_json_file(&args.file, &report, JsonStyle::Pretty)?;
    println!("{}", completion_table(&report));
    Ok(())
}

fn completion_table(report: &[Completion]) -> comfy_table::Table {
    let mut table = styled_table();
    table.set_header(vec![
        header("Workflow"),
        header("Subject set"),
        header("Retired"),
        header("Subjects"),
        header("%"),
    ]);
    apply_column_padding(&mut table, (0, 3));
    for workflow in report {
        table.add_row(vec![
            workflow.display_name.clone(),
            "-".to_string(),
            workflow.retired_count.to_string(),
            workflow.subjects_count.to_string(),
            workflow.percentage.to_string(),
        ]);
        for set in workflow.subject_sets.iter().flatten() {
            table.add_row(vec![
                String::new(),
                set.display_name.clone(),
                set.retired_count.to_string(),
                set.subjects_count.to_string(),
                set.percentage.to_string(),
            ]);
        }
    }
    table
}
