use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};
use tracing::instrument;

use super::api::{self, Subject, SubjectSet};
use super::{join_words, Credentials, ProjectRef};
use crate::epicollect::api::raw_entries;
use crate::epicollect::remap::remap_entries;
use crate::epicollect::schema::FormSelection;
use crate::files::read_json_file;
use crate::observation::Observation;
use crate::ui::{header, styled_table};
use crate::utils::pluralize;

#[derive(Debug, Clone, Args)]
pub struct SubjectSetArgs {
    #[command(subcommand)]
    command: SubjectSetCommands,
}

#[derive(Debug, Clone, Subcommand)]
enum SubjectSetCommands {
    /// Create a subject set from an Epicollect5 export and attach it to every workflow
    Create(CreateArgs),
    /// List the subject sets of a project with their subjects' status
    Show(ShowArgs),
}

#[derive(Debug, Clone, Args)]
struct CreateArgs {
    #[command(flatten)]
    credentials: Credentials,
    #[command(flatten)]
    project: ProjectRef,

    /// Subject set name
    #[arg(short = 'n', long, num_args = 1.., required = true)]
    name: Vec<String>,

    /// Raw Epicollect5 export with the images and metadata to upload
    #[arg(short = 'f', long)]
    file: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct ShowArgs {
    #[command(flatten)]
    credentials: Credentials,
    #[command(flatten)]
    project: ProjectRef,
}

pub async fn run(args: SubjectSetArgs) -> Result<()> {
    match args.command {
        SubjectSetCommands::Create(args) => create(args).await,
        SubjectSetCommands::Show(args) => show(args).await,
    }
}

/// Panoptes subject document for one observation: the image plus the
/// metadata volunteers and the reducers need.
pub fn subject_body(observation: &Observation, project_id: &str) -> Value {
    json!({
        "locations": [{"image/jpg": observation.url}],
        "metadata": {
            "id": observation.id,
            "id_type": "ec5_uuid",
            "url": observation.url,
            "created_at": observation.created_at,
            "longitude": observation.location.longitude,
            "latitude": observation.location.latitude,
            "comment": observation.comment,
        },
        "links": {"project": project_id},
    })
}

fn read_observations(file: &Path) -> Result<Vec<Observation>> {
    let document: Value = read_json_file(file)?;
    let entries = raw_entries(document)?;
    remap_entries(entries, FormSelection::Auto)
        .collect::<Result<_, _>>()
        .with_context(|| format!("failed to remap {}", file.display()))
}

#[instrument(name = "subjectset_create", skip_all, fields(project = %args.project.project))]
async fn create(args: CreateArgs) -> Result<()> {
    let observations = read_observations(&args.file)?;
    tracing::info!(
        "read {} {} from {}",
        observations.len(),
        pluralize(observations.len(), "observation", None),
        args.file.display()
    );

    let zooniverse = args.credentials.login().await?;
    let project = zooniverse.project(&args.project.project).await?;
    let subject_set: SubjectSet = api::create(
        zooniverse.api(),
        json!({
            "display_name": join_words(&args.name),
            "links": {"project": project.id},
        }),
    )
    .await?;
    tracing::info!("created subject set {}", subject_set.id);

    let mut throttle = zooniverse.throttle();
    let mut subject_ids = Vec::with_capacity(observations.len());
    for (index, observation) in observations.iter().enumerate() {
        let subject: Subject = api::create(zooniverse.api(), subject_body(observation, &project.id))
            .await
            .with_context(|| format!("failed to save subject for observation #{index}"))?;
        tracing::debug!(subject = %subject.id, observation = %observation.id, "subject saved");
        subject_ids.push(subject.id);
        throttle.wait().await;
    }
    tracing::info!(
        "saved {} {}",
        subject_ids.len(),
        pluralize(subject_ids.len(), "subject", None)
    );

    let set_path = format!("subject_sets/{}", subject_set.id);
    if !subject_ids.is_empty() {
        api::link(zooniverse.api(), &set_path, "subjects", &subject_ids).await?;
    }
    for workflow_id in &project.links.workflows {
        api::link(
            zooniverse.api(),
            &format!("workflows/{workflow_id}"),
            "subject_sets",
            std::slice::from_ref(&subject_set.id),
        )
        .await?;
        tracing::info!("added subject set {} to workflow {workflow_id}", subject_set.id);
    }
    tracing::info!("created new subject set #{}", subject_set.id);
    Ok(())
}

#[instrument(name = "subjectset_show", skip_all, fields(project = %args.project.project))]
async fn show(args: ShowArgs) -> Result<()> {
    let zooniverse = args.credentials.login().await?;
    let project = zooniverse.project(&args.project.project).await?;
    let sets: Vec<SubjectSet> = zooniverse.list(&[("project_id", project.id.as_str())]).await?;

    let mut table = styled_table();
    table.set_header(vec![
        header("Subject set"),
        header("Subject"),
        header("Classifications"),
        header("Retirement"),
    ]);
    for set in &sets {
        tracing::info!(
            "subject set #{}, name {}, metadata {}",
            set.id,
            set.display_name,
            set.metadata
        );
        let subjects: Vec<Subject> = zooniverse.list(&[("subject_set_id", set.id.as_str())]).await?;
        for subject in &subjects {
            let status =
                api::subject_status(zooniverse.api(), &subject.id, None, zooniverse.throttle())
                    .await?;
            let (classifications, retirement) = match &status {
                Some(status) => {
                    tracing::info!(
                        "  subject #{}, status #{}, retirement reason {:?}, classifications {}",
                        subject.id,
                        status.id,
                        status.retirement_reason,
                        status.classifications_count
                    );
                    (
                        status.classifications_count.to_string(),
                        status.retirement_reason.clone().unwrap_or_else(|| "-".to_string()),
                    )
                }
                None => {
                    tracing::info!("  subject #{} has no workflow status", subject.id);
                    ("0".to_string(), "-".to_string())
                }
            };
            table.add_row(vec![
                set.display_name.clone(),
                subject.id.clone(),
                classifications,
                retirement,
            ]);
        }
    }
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{Location, PROJECT, RECORD_TYPE, SOURCE_EPICOLLECT5};

    #[test]
    fn subject_carries_image_and_observation_metadata() {
        let observation = Observation {
            id: "uuid-1".to_string(),
            created_at: "2021-06-01T10:15:30 UTC".to_string(),
            uploaded_at: "2021-06-01T10:20:00 UTC".to_string(),
            title: None,
            nickname: Some("rafa".to_string()),
            location: Location {
                latitude: Some(40.4),
                longitude: Some(-3.7),
                accuracy: None,
            },
            url: Some("https://five.epicollect.net/img/1.jpg".to_string()),
            comment: None,
            project: PROJECT.to_string(),
            source: SOURCE_EPICOLLECT5.to_string(),
            kind: RECORD_TYPE.to_string(),
            written_at: None,
        };
        let body = subject_body(&observation, "5");
        assert_eq!(
            body["locations"][0]["image/jpg"],
            "https://five.epicollect.net/img/1.jpg"
        );
        assert_eq!(body["metadata"]["id_type"], "ec5_uuid");
        assert_eq!(body["metadata"]["latitude"], 40.4);
        assert!(body["metadata"]["comment"].is_null());
        assert_eq!(body["links"]["project"], "5");
    }
}
