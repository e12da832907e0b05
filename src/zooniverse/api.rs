//! Panoptes resources and the handful of JSON-API calls the commands need.
//!
//! Collections come back as `{"<key>": [...], "meta": {"<key>": {"next_href": ..}}}`
//! and are walked with the shared [`CursorPager`]. Writes wrap the resource in
//! its key: `{"<key>": {...}}`.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use futures_util::TryStreamExt;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::http::ApiClient;
use crate::paginate::{CursorPage, CursorPager};
use crate::session::Throttle;

pub const DEFAULT_URL: &str = "https://www.zooniverse.org";

/// A Panoptes resource type and the key its documents live under.
pub trait Resource: DeserializeOwned {
    const KEY: &'static str;
}

pub struct ResourcePage<R> {
    items: Vec<R>,
    page: Option<u64>,
    next_href: Option<String>,
}

impl<'de, R: Resource> Deserialize<'de> for ResourcePage<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut body = Map::<String, Value>::deserialize(deserializer)?;
        let items = match body.remove(R::KEY) {
            Some(value) => serde_json::from_value(value).map_err(D::Error::custom)?,
            None => Vec::new(),
        };
        let meta = body.get("meta").and_then(|meta| meta.get(R::KEY));
        Ok(Self {
            items,
            page: meta.and_then(|m| m.get("page")).and_then(Value::as_u64),
            next_href: meta
                .and_then(|m| m.get("next_href"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

impl<R: Resource> CursorPage for ResourcePage<R> {
    type Item = R;

    fn next_url(&self) -> Option<String> {
        self.next_href.clone()
    }

    fn page_number(&self) -> Option<u64> {
        self.page
    }

    fn into_items(self) -> Vec<R> {
        self.items
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectLinks {
    #[serde(default)]
    pub workflows: Vec<String>,
    #[serde(default)]
    pub subject_sets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub primary_language: Option<String>,
    #[serde(default)]
    pub links: ProjectLinks,
}

impl Resource for Project {
    const KEY: &'static str = "projects";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowLinks {
    #[serde(default)]
    pub subject_sets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub subjects_count: u64,
    #[serde(default)]
    pub retired_set_member_subjects_count: u64,
    #[serde(default)]
    pub links: WorkflowLinks,
}

impl Resource for Workflow {
    const KEY: &'static str = "workflows";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSet {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub set_member_subjects_count: u64,
    #[serde(default)]
    pub metadata: Value,
}

impl Resource for SubjectSet {
    const KEY: &'static str = "subject_sets";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub metadata: Value,
}

impl Resource for Subject {
    const KEY: &'static str = "subjects";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectWorkflowStatus {
    pub id: String,
    #[serde(default)]
    pub classifications_count: u64,
    #[serde(default)]
    pub retirement_reason: Option<String>,
    #[serde(default)]
    pub retired_at: Option<String>,
}

impl SubjectWorkflowStatus {
    pub fn is_retired(&self) -> bool {
        self.retirement_reason.is_some()
    }
}

impl Resource for SubjectWorkflowStatus {
    const KEY: &'static str = "subject_workflow_statuses";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub annotations: Value,
}

impl Resource for Classification {
    const KEY: &'static str = "classifications";
}

/// Walk every page of `path` filtered by `params`.
pub async fn list<R: Resource>(
    client: &ApiClient,
    path: &str,
    params: &[(&str, &str)],
    throttle: Throttle,
) -> Result<Vec<R>> {
    let start = client.url(path)?;
    let params = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    CursorPager::<ResourcePage<R>>::new(client.clone(), start, params, throttle)
        .into_stream()
        .try_collect()
        .await
        .with_context(|| format!("failed to list {}", R::KEY))
}

/// Fetch the resources with the given ids, in the order the ids are given.
pub async fn by_ids<R: Resource + HasId>(
    client: &ApiClient,
    ids: &[String],
    throttle: Throttle,
) -> Result<Vec<R>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let joined = ids.join(",");
    let mut found: HashMap<String, R> = list::<R>(client, R::KEY, &[("id", joined.as_str())], throttle)
        .await?
        .into_iter()
        .map(|item| (item.id().to_string(), item))
        .collect();
    ids.iter()
        .map(|id| {
            found
                .remove(id)
                .ok_or_else(|| anyhow!("{} {id} not found", R::KEY))
        })
        .collect()
}

pub trait HasId {
    fn id(&self) -> &str;
}

macro_rules! has_id {
    ($($ty:ty),*) => {
        $(impl HasId for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

has_id!(Project, Workflow, SubjectSet, Subject);

pub async fn find_project(client: &ApiClient, slug: &str, throttle: Throttle) -> Result<Project> {
    tracing::info!("finding project by slug: {slug}");
    list::<Project>(client, Project::KEY, &[("slug", slug)], throttle)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("project '{slug}' not found"))
}

fn keyed(key: &str, value: Value) -> Value {
    let mut document = Map::new();
    document.insert(key.to_string(), value);
    Value::Object(document)
}

/// POST `{KEY: body}` and return the created resource.
pub async fn create<R: Resource>(client: &ApiClient, body: Value) -> Result<R> {
    let url = client.url(R::KEY)?;
    let page: ResourcePage<R> = client
        .post(url, &keyed(R::KEY, body))
        .await
        .with_context(|| format!("failed to create {}", R::KEY))?;
    page.into_items()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("empty response creating {}", R::KEY))
}

/// Add `ids` to the `relation` link of `owner_path` (e.g. `workflows/12`).
pub async fn link(client: &ApiClient, owner_path: &str, relation: &str, ids: &[String]) -> Result<()> {
    let url = client.url(&format!("{owner_path}/links/{relation}"))?;
    client
        .post_unit(url, &keyed(relation, json!(ids)))
        .await
        .with_context(|| format!("failed to link {relation} to {owner_path}"))
}

/// The status of `subject` inside `workflow`, if Panoptes has one.
pub async fn subject_status(
    client: &ApiClient,
    subject_id: &str,
    workflow_id: Option<&str>,
    throttle: Throttle,
) -> Result<Option<SubjectWorkflowStatus>> {
    let mut params = vec![("subject_id", subject_id)];
    if let Some(workflow_id) = workflow_id {
        params.push(("workflow_id", workflow_id));
    }
    let statuses =
        list::<SubjectWorkflowStatus>(client, SubjectWorkflowStatus::KEY, &params, throttle).await?;
    Ok(statuses.into_iter().next())
}
