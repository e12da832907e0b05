//! `zoonispectra`: manage the StreetSpectra project on Zooniverse through the
//! Panoptes API.

use std::io::IsTerminal;

use anyhow::{bail, Result};
use clap::Args;

use crate::http::ApiClient;
use crate::session::{Pacing, Throttle};

pub mod api;
pub mod auth;
mod export;
pub mod project;
pub mod subjectset;
pub mod workflow;

use api::{Project, Resource};
use auth::PanoptesSession;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_TPS: f64 = 10.0;
const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Args)]
pub struct Credentials {
    /// Zooniverse username
    #[arg(short = 'u', long, env = "ZOONIVERSE_USERNAME")]
    pub username: String,

    /// Zooniverse password (prompted for when omitted)
    #[arg(long, env = "ZOONIVERSE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Zooniverse site URL
    #[arg(long, env = "ZOONIVERSE_URL", default_value = api::DEFAULT_URL)]
    pub zooniverse_url: String,

    /// Requests per second
    #[arg(long, default_value_t = DEFAULT_TPS)]
    pub tps: f64,
}

#[derive(Debug, Clone, Args)]
pub struct ProjectRef {
    /// Project slug, `owner/name` or just `name` for one of your own projects
    #[arg(short = 'p', long)]
    pub project: String,
}

impl Credentials {
    fn password(&self) -> Result<String> {
        if let Some(password) = &self.password {
            return Ok(password.clone());
        }
        if !std::io::stdin().is_terminal() {
            bail!("--password required (or set ZOONIVERSE_PASSWORD)");
        }
        let password: String = dialoguer::Password::new()
            .with_prompt(format!("Zooniverse password for {}", self.username))
            .interact()?;
        Ok(password)
    }

    pub async fn login(&self) -> Result<Zooniverse> {
        let pacing = Pacing::new(PAGE_SIZE, self.tps)?;
        let password = self.password()?;
        let session =
            PanoptesSession::login(&self.zooniverse_url, &self.username, &password).await?;
        Ok(Zooniverse { session, pacing })
    }
}

/// A logged-in session plus the request pacing every call goes through.
pub struct Zooniverse {
    session: PanoptesSession,
    pacing: Pacing,
}

impl Zooniverse {
    pub fn api(&self) -> &ApiClient {
        self.session.api()
    }

    pub fn throttle(&self) -> Throttle {
        self.pacing.throttle()
    }

    pub async fn list<R: Resource>(&self, params: &[(&str, &str)]) -> Result<Vec<R>> {
        let page_size = self.pacing.page_size.to_string();
        let mut params = params.to_vec();
        params.push(("page_size", page_size.as_str()));
        api::list(self.api(), R::KEY, &params, self.throttle()).await
    }

    pub async fn by_ids<R: Resource + api::HasId>(&self, ids: &[String]) -> Result<Vec<R>> {
        api::by_ids(self.api(), ids, self.throttle()).await
    }

    pub async fn project(&self, project: &str) -> Result<Project> {
        let slug = self.session.project_slug(project);
        api::find_project(self.api(), &slug, self.throttle()).await
    }
}

/// Integer share of `part` in `total`, 0 for an empty total.
pub fn percentage(part: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        100 * part / total
    }
}

pub(crate) fn join_words(words: &[String]) -> String {
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_truncates_and_handles_empty_sets() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(3, 3), 100);
    }

    #[test]
    fn names_given_as_several_words_are_joined() {
        let words = vec!["Street".to_string(), "Spectra".to_string()];
        assert_eq!(join_words(&words), "Street Spectra");
    }
}
