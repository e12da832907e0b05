//! Typed failures raised by the fetch, remap and upload layers.
//!
//! Command modules wrap these in `anyhow` with context; nothing below the
//! command dispatcher retries or recovers.

use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::epicollect::schema::Ec5Form;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{method} {url} failed ({status}): {body}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RemapError {
    #[error("unknown field '{field}' for the {form} Epicollect5 form")]
    UnknownField { field: String, form: Ec5Form },

    #[error("entry {id} does not match any known Epicollect5 form")]
    UnrecognizedForm { id: String },

    #[error("entry is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("cannot parse {field} timestamp '{value}': {source}")]
    Timestamp {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid value for field '{field}': {source}")]
    InvalidValue {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("entry #{index} is not a JSON object")]
    NotAnObject { index: usize },
}

/// The upload loop stopped at `index`; records before it were already written.
#[derive(Debug, Error)]
#[error("upload aborted at record #{index} ({index} already written)")]
pub struct UploadError {
    pub index: usize,
    #[source]
    pub source: HttpError,
}
