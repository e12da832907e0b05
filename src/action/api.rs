use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::http::ApiClient;
use crate::paginate::{OffsetPage, OffsetPager, OffsetWindow};
use crate::session::{Pacing, Throttle};
use crate::timefmt::ACTION_QUERY_FORMAT;

pub const DEFAULT_API_URL: &str = "https://api.actionproject.eu";
pub const OBSERVATIONS_ENDPOINT: &str = "observations";
pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Deserialize)]
pub struct ResultPage {
    result: Vec<Value>,
}

impl OffsetPage for ResultPage {
    type Item = Value;

    fn into_items(self) -> Vec<Value> {
        self.result
    }
}

/// Authenticated client, observations URL and pacing for one run.
#[derive(Debug)]
pub struct ActionSession {
    pub client: ApiClient,
    pub url: Url,
    pub pacing: Pacing,
}

impl ActionSession {
    pub fn open(api_url: &str, token: &str, page_size: usize, tps: f64) -> Result<Self> {
        let pacing = Pacing::new(page_size, tps)?;
        let client = ApiClient::new(api_url)
            .with_context(|| format!("invalid ACTION API URL {api_url}"))?
            .with_bearer_token(token);
        let url = client.url(OBSERVATIONS_ENDPOINT)?;
        Ok(Self { client, url, pacing })
    }

    pub fn throttle(&self) -> Throttle {
        self.pacing.throttle()
    }
}

#[derive(Debug, Clone)]
pub struct ObservationQuery {
    pub project: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub limit: usize,
}

impl ObservationQuery {
    pub fn params(&self) -> Vec<(String, String)> {
        vec![
            (
                "begin_date".to_string(),
                self.start.format(ACTION_QUERY_FORMAT).to_string(),
            ),
            (
                "finish_date".to_string(),
                self.end.format(ACTION_QUERY_FORMAT).to_string(),
            ),
            ("project".to_string(), self.project.clone()),
            ("obs_type".to_string(), "observations".to_string()),
        ]
    }
}

pub fn observations_pager(session: &ActionSession, query: &ObservationQuery) -> OffsetPager<ResultPage> {
    let window = OffsetWindow {
        page_size: session.pacing.page_size,
        limit: query.limit,
        offset_param: "page",
        size_param: "limit",
    };
    OffsetPager::new(
        session.client.clone(),
        session.url.clone(),
        query.params(),
        window,
        session.throttle(),
    )
}
