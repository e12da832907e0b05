use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::http::ApiClient;

/// CSV columns that hold JSON documents.
const JSON_COLUMNS: [&str; 3] = ["metadata", "annotations", "subject_data"];
const READY: &str = "ready";

#[derive(Debug, Clone, Deserialize)]
pub struct ExportMedia {
    pub id: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: ExportState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportState {
    #[serde(default)]
    pub state: Option<String>,
}

impl ExportMedia {
    pub fn is_ready(&self) -> bool {
        self.metadata.state.as_deref() == Some(READY)
    }
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(default)]
    media: Vec<ExportMedia>,
}

/// How a classification export is obtained.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest {
    /// Ask Panoptes to build a fresh export first.
    pub generate: bool,
    /// Wait for an in-progress export. Implied by `generate`.
    pub wait: bool,
    pub timeout: Duration,
    pub poll_every: Duration,
}

fn export_path(project_id: &str) -> String {
    format!("projects/{project_id}/classifications_export")
}

pub async fn describe(client: &ApiClient, project_id: &str) -> Result<Option<ExportMedia>> {
    let url = client.url(&export_path(project_id))?;
    let response: MediaResponse = client.get(url).await?;
    Ok(response.media.into_iter().next())
}

pub async fn generate(client: &ApiClient, project_id: &str) -> Result<()> {
    let url = client.url(&export_path(project_id))?;
    client
        .post_unit(url, &json!({"media": {"content_type": "text/csv"}}))
        .await
        .context("failed to request a new classification export")
}

/// Poll until the export is ready or `timeout` elapses.
pub async fn wait_ready(
    client: &ApiClient,
    project_id: &str,
    timeout: Duration,
    poll_every: Duration,
) -> Result<ExportMedia> {
    let started = Instant::now();
    loop {
        if let Some(media) = describe(client, project_id).await? {
            if media.is_ready() {
                return Ok(media);
            }
            tracing::debug!(state = ?media.metadata.state, "export not ready yet");
        }
        if started.elapsed() >= timeout {
            bail!(
                "classification export not ready after {} seconds",
                timeout.as_secs()
            );
        }
        tokio::time::sleep(poll_every).await;
    }
}

/// Fetch the classification export of `project_id` as CSV rows with their JSON
/// columns decoded.
pub async fn classification_rows(
    client: &ApiClient,
    project_id: &str,
    request: ExportRequest,
) -> Result<Vec<Map<String, Value>>> {
    if request.generate {
        generate(client, project_id).await?;
    }
    let media = if request.generate || request.wait {
        wait_ready(client, project_id, request.timeout, request.poll_every).await?
    } else {
        describe(client, project_id)
            .await?
            .ok_or_else(|| anyhow!("project {project_id} has no classification export yet"))?
    };
    let src = media
        .src
        .as_deref()
        .ok_or_else(|| anyhow!("classification export {} has no download link", media.id))?;
    tracing::info!(updated_at = ?media.updated_at, "downloading classification export");

    // Export links are pre-signed; they must not carry our bearer token.
    let downloader = ApiClient::new(src)?;
    let url = downloader.url(src)?;
    let csv_text = downloader
        .get_text(url)
        .await
        .context("failed to download classification export")?;
    parse_rows(&csv_text)
}

pub fn parse_rows(csv_text: &str) -> Result<Vec<Map<String, Value>>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader.headers().context("export has no header row")?.clone();
    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("malformed export row {}", line + 1))?;
        let mut row = Map::new();
        for (column, field) in headers.iter().zip(record.iter()) {
            let value = if JSON_COLUMNS.contains(&column) {
                serde_json::from_str(field).with_context(|| {
                    format!("column '{column}' of export row {} is not JSON", line + 1)
                })?
            } else {
                Value::String(field.to_string())
            };
            row.insert(column.to_string(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const CSV: &str = "classification_id,user_name,metadata,annotations,subject_data\n\
        101,rafa,\"{\"\"source\"\":\"\"api\"\"}\",\"[{\"\"task\"\":\"\"T0\"\",\"\"value\"\":1}]\",\"{\"\"77\"\":{\"\"retired\"\":null}}\"\n";

    #[test]
    fn json_columns_are_decoded() {
        let rows = parse_rows(CSV).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["classification_id"], json!("101"));
        assert_eq!(rows[0]["metadata"], json!({"source": "api"}));
        assert_eq!(rows[0]["annotations"][0]["task"], json!("T0"));
        assert_eq!(rows[0]["subject_data"]["77"]["retired"], Value::Null);
    }

    #[test]
    fn broken_json_column_names_the_row() {
        let csv = "classification_id,metadata\n1,{not json\n";
        let err = parse_rows(csv).unwrap_err();
        assert!(format!("{err:#}").contains("row 1"));
    }

    #[tokio::test]
    async fn waits_for_export_then_downloads_without_token() {
        let server = MockServer::start().await;
        let src = format!("{}/exports/classifications.csv", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/projects/5/classifications_export"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "media": [{"id": "9", "src": src, "metadata": {"state": "creating"}}]
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/projects/5/classifications_export"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "media": [{"id": "9", "src": src, "metadata": {"state": "ready"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/exports/classifications.csv"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(403))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/exports/classifications.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CSV))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/api", server.uri()))
            .unwrap()
            .with_bearer_token("t");
        let request = ExportRequest {
            generate: false,
            wait: true,
            timeout: Duration::from_secs(5),
            poll_every: Duration::from_millis(10),
        };
        let rows = classification_rows(&client, "5", request).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn wait_gives_up_after_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/5/classifications_export"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "media": [{"id": "9", "metadata": {"state": "creating"}}]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/api", server.uri())).unwrap();
        let err = wait_ready(&client, "5", Duration::ZERO, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not ready"));
    }
}
