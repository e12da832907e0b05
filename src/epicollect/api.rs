use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::http::ApiClient;
use crate::paginate::{CursorPage, CursorPager};
use crate::session::Throttle;
use crate::timefmt::EC5_QUERY_FORMAT;

pub const DEFAULT_API_URL: &str = "https://five.epicollect.net/api";
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
pub struct EntriesPage {
    #[serde(default)]
    meta: PageMeta,
    #[serde(default)]
    links: PageLinks,
    data: EntriesData,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    current_page: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntriesData {
    #[serde(default)]
    entries: Vec<Value>,
}

impl CursorPage for EntriesPage {
    type Item = Value;

    fn next_url(&self) -> Option<String> {
        self.links.next.clone().filter(|link| !link.is_empty())
    }

    fn page_number(&self) -> Option<u64> {
        self.meta.current_page
    }

    fn into_items(self) -> Vec<Value> {
        self.data.entries
    }
}

/// Filter for `export/entries/{slug}`: entries created inside `[start, end]`,
/// oldest first.
#[derive(Debug, Clone)]
pub struct EntriesQuery {
    pub slug: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub page_size: usize,
}

impl EntriesQuery {
    pub fn params(&self) -> Vec<(String, String)> {
        vec![
            ("per_page".to_string(), self.page_size.to_string()),
            ("filter_by".to_string(), "created_at".to_string()),
            (
                "filter_from".to_string(),
                self.start.format(EC5_QUERY_FORMAT).to_string(),
            ),
            (
                "filter_to".to_string(),
                self.end.format(EC5_QUERY_FORMAT).to_string(),
            ),
            ("sort_by".to_string(), "created_at".to_string()),
            ("sort_order".to_string(), "ASC".to_string()),
        ]
    }
}

/// Anonymous client unless a token is given (private projects).
pub fn connect(api_url: &str, token: Option<&str>) -> Result<ApiClient> {
    let client = ApiClient::new(api_url)
        .with_context(|| format!("invalid Epicollect5 API URL {api_url}"))?;
    Ok(match token {
        Some(token) => client.with_bearer_token(token),
        None => client,
    })
}

pub fn entries_pager(
    client: ApiClient,
    query: &EntriesQuery,
    throttle: Throttle,
) -> Result<CursorPager<EntriesPage>> {
    let path = format!("export/entries/{}", urlencoding::encode(&query.slug));
    let start = client.url(&path)?;
    Ok(CursorPager::new(client, start, query.params(), throttle))
}

/// Pull the raw entry array out of a previously saved export. Accepts a bare
/// array as well as the API's `data` envelopes.
pub fn raw_entries(document: Value) -> Result<Vec<Value>> {
    match document {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(entries)) => Ok(entries),
            Some(Value::Object(mut data)) => match data.remove("entries") {
                Some(Value::Array(entries)) => Ok(entries),
                _ => bail!("'data' object has no 'entries' array"),
            },
            _ => bail!("expected a JSON array of entries or a 'data' envelope"),
        },
        _ => bail!("expected a JSON array of entries"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::timefmt::parse_cli_date;

    fn query(slug: &str) -> EntriesQuery {
        EntriesQuery {
            slug: slug.to_string(),
            start: parse_cli_date("2019-01-01").unwrap(),
            end: parse_cli_date("2021-12-31T23:59:59").unwrap(),
            page_size: 2,
        }
    }

    #[test]
    fn query_filters_and_sorts_by_creation() {
        let params = query("street-spectra").params();
        assert!(params.contains(&("filter_from".to_string(), "2019-01-01T00:00:00".to_string())));
        assert!(params.contains(&("filter_to".to_string(), "2021-12-31T23:59:59".to_string())));
        assert!(params.contains(&("sort_order".to_string(), "ASC".to_string())));
        assert!(params.contains(&("per_page".to_string(), "2".to_string())));
    }

    #[test]
    fn raw_entries_accepts_all_envelopes() {
        let entry = json!({"ec5_uuid": "a"});
        for document in [
            json!([entry.clone()]),
            json!({"data": [entry.clone()]}),
            json!({"data": {"entries": [entry.clone()]}}),
        ] {
            assert_eq!(raw_entries(document).unwrap(), vec![entry.clone()]);
        }
        assert!(raw_entries(json!({"entries": []})).is_err());
        assert!(raw_entries(json!("nope")).is_err());
    }

    #[tokio::test]
    async fn follows_next_links_until_the_last_page() {
        let server = MockServer::start().await;
        let second = format!(
            "{}/export/entries/street-spectra?page=2&per_page=2",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/export/entries/street-spectra"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"current_page": 2},
                "links": {"next": null},
                "data": {"entries": [{"ec5_uuid": "c"}]}
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/export/entries/street-spectra"))
            .and(query_param("filter_by", "created_at"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"current_page": 1},
                "links": {"next": second},
                "data": {"entries": [{"ec5_uuid": "a"}, {"ec5_uuid": "b"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&server.uri(), None).unwrap();
        let pager = entries_pager(client, &query("street-spectra"), Throttle::new(Duration::ZERO))
            .unwrap();
        let entries: Vec<Value> = pager.into_stream().try_collect().await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e["ec5_uuid"].as_str().unwrap()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
