use std::sync::LazyLock;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::json;

use crate::http::ApiClient;

/// OAuth client id of the public Panoptes API application.
const CLIENT_ID: &str = "f79cf5ea821bb161d8cbb52d061ab9a2321d7cb169007003af66b43f7b79ce2a";
pub const API_ACCEPT: &str = "application/vnd.api+json; version=1";

static CSRF_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta\s+name="csrf-token"\s+content="([^"]+)""#).unwrap());

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// An authenticated Panoptes session. The bearer token lives as long as this
/// value; dropping it ends the session.
#[derive(Debug)]
pub struct PanoptesSession {
    api: ApiClient,
    username: String,
}

impl PanoptesSession {
    /// Password login the way the Panoptes web front end does it: scrape the
    /// CSRF token, post the credentials, then trade the session cookie for a
    /// bearer token.
    pub async fn login(root_url: &str, username: &str, password: &str) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("spectra-tools/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        let site = ApiClient::with_http(http.clone(), root_url)?;

        tracing::debug!(%username, "requesting CSRF token");
        let sign_in = site.url("users/sign_in")?;
        let page = site
            .send(Method::GET, sign_in.clone(), |r| {
                r.header(ACCEPT, HeaderValue::from_static("text/html"))
            })
            .await?
            .text()
            .await
            .context("failed to read sign-in page")?;
        let csrf = csrf_token(&page).ok_or_else(|| anyhow!("no CSRF token on sign-in page"))?;

        let credentials = json!({
            "authenticity_token": csrf,
            "user": {
                "login": username,
                "password": password,
                "remember_me": true,
            },
        });
        site.send(Method::POST, sign_in, |r| {
            r.header("X-Requested-With", "XMLHttpRequest")
                .header("X-CSRF-Token", csrf.as_str())
                .json(&credentials)
        })
        .await
        .with_context(|| format!("Zooniverse sign-in failed for user '{username}'"))?;

        let token: TokenResponse = site
            .send(Method::POST, site.url("oauth/token")?, |r| {
                r.form(&[("grant_type", "password"), ("client_id", CLIENT_ID)])
            })
            .await?
            .json()
            .await
            .context("failed to decode bearer token response")?;
        tracing::info!(%username, expires_in = ?token.expires_in, "logged in to Zooniverse");

        let api_url = format!("{}/api", root_url.trim_end_matches('/'));
        let api = ApiClient::with_http(http, &api_url)?
            .with_bearer_token(token.access_token)
            .with_accept(API_ACCEPT);
        Ok(Self {
            api,
            username: username.to_string(),
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Fully qualified `owner/name` slug for `project`.
    pub fn project_slug(&self, project: &str) -> String {
        qualify_slug(&self.username, project)
    }
}

impl Drop for PanoptesSession {
    fn drop(&mut self) {
        tracing::debug!(username = %self.username, "Zooniverse session released");
    }
}

pub fn qualify_slug(username: &str, project: &str) -> String {
    if project.contains('/') {
        project.to_string()
    } else {
        format!("{username}/{project}")
    }
}

fn csrf_token(html: &str) -> Option<String> {
    CSRF_TOKEN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
