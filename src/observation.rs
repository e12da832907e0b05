use serde::{Deserialize, Serialize};

pub const PROJECT: &str = "street-spectra";
pub const SOURCE_EPICOLLECT5: &str = "Epicollect5";
pub const RECORD_TYPE: &str = "observation";

/// GPS fix attached to an observation. Every coordinate is always present in
/// the serialized form, `null` when unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Canonical observation record every source schema is remapped into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub created_at: String,
    pub uploaded_at: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    pub project: String,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_at: Option<String>,
}
