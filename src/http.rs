use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HttpError;

const USER_AGENT: &str = concat!("spectra-tools/", env!("CARGO_PKG_VERSION"));

/// Thin authenticated wrapper around a `reqwest::Client` bound to one service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
    headers: HeaderMap,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|source| HttpError::Transport {
                method: Method::GET,
                url: base_url.to_string(),
                source,
            })?;
        Self::with_http(http, base_url)
    }

    pub fn with_http(http: Client, base_url: &str) -> Result<Self, HttpError> {
        // A trailing slash keeps `Url::join` from dropping the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = parse_url(&normalized)?;
        Ok(Self {
            http,
            base_url,
            token: None,
            headers: HeaderMap::new(),
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.headers.insert(ACCEPT, HeaderValue::from_static(accept));
        self
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through untouched.
    pub fn url(&self, path: &str) -> Result<Url, HttpError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return parse_url(path);
        }
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| HttpError::InvalidUrl {
                url: path.to_string(),
                reason: err.to_string(),
            })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self.http.request(method, url).headers(self.headers.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, HttpError> {
        let response = self.send(Method::GET, url, |r| r).await?;
        decode(Method::GET, response).await
    }

    pub async fn get_text(&self, url: Url) -> Result<String, HttpError> {
        let response = self.send(Method::GET, url.clone(), |r| r).await?;
        response.text().await.map_err(|source| HttpError::Transport {
            method: Method::GET,
            url: url.to_string(),
            source,
        })
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, HttpError> {
        let response = self.send(Method::POST, url, |r| r.json(body)).await?;
        decode(Method::POST, response).await
    }

    /// POST a JSON body and discard whatever the server answers.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<(), HttpError> {
        self.send(Method::POST, url, |r| r.json(body)).await?;
        Ok(())
    }

    pub async fn send(
        &self,
        method: Method,
        url: Url,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, HttpError> {
        let url_text = url.to_string();
        tracing::debug!(%method, url = %url_text, "sending request");
        let response = build(self.request(method.clone(), url))
            .send()
            .await
            .map_err(|source| HttpError::Transport {
                method: method.clone(),
                url: url_text.clone(),
                source,
            })?;
        error_for_status(method, response).await
    }
}

pub fn parse_url(value: &str) -> Result<Url, HttpError> {
    Url::parse(value).map_err(|err| HttpError::InvalidUrl {
        url: value.to_string(),
        reason: err.to_string(),
    })
}

/// Append `params` to `url`, skipping keys the URL already carries.
pub fn merge_query(url: &mut Url, params: &[(String, String)]) {
    let existing: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    let missing: Vec<&(String, String)> = params
        .iter()
        .filter(|(key, _)| !existing.iter().any(|e| e == key))
        .collect();
    if missing.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in missing {
        pairs.append_pair(key, value);
    }
}

pub async fn error_for_status(method: Method, response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status {
        method,
        url,
        status,
        body,
    })
}

async fn decode<T: DeserializeOwned>(method: Method, response: Response) -> Result<T, HttpError> {
    let url = response.url().to_string();
    let bytes = response.bytes().await.map_err(|source| HttpError::Transport {
        method,
        url: url.clone(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| HttpError::Decode { url, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_relative_paths_onto_base() {
        let client = ApiClient::new("https://www.zooniverse.org/api").unwrap();
        let url = client.url("/projects?slug=a/b").unwrap();
        assert_eq!(url.as_str(), "https://www.zooniverse.org/api/projects?slug=a/b");
    }

    #[test]
    fn url_keeps_absolute_links() {
        let client = ApiClient::new("https://five.epicollect.net/api").unwrap();
        let url = client
            .url("https://five.epicollect.net/api/export/entries/x?page=2")
            .unwrap();
        assert_eq!(url.as_str(), "https://five.epicollect.net/api/export/entries/x?page=2");
    }

    #[test]
    fn merge_query_does_not_duplicate_existing_keys() {
        let mut url = Url::parse("https://example.org/entries?page=2&per_page=5").unwrap();
        merge_query(
            &mut url,
            &[
                ("per_page".to_string(), "5".to_string()),
                ("sort_order".to_string(), "ASC".to_string()),
            ],
        );
        assert_eq!(url.query(), Some("page=2&per_page=5&sort_order=ASC"));
    }
}
