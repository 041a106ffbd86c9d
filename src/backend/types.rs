//! Wire types for the extraction backend's JSON endpoints.

use serde::{Deserialize, Serialize};

use crate::session::{AudioFormat, Quality};

/// Body of `POST download`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitBody<'a> {
    pub url: &'a str,
    pub format: AudioFormat,
    pub quality: Quality,
}

/// Successful answer to `POST download`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAccepted {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Shape of every error answer: `{"error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Video metadata returned by `GET info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Length in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formatted_duration: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
}

/// Answer to `GET formats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatCatalog {
    pub formats: Vec<String>,
    pub qualities: Vec<String>,
    pub default_format: String,
    pub default_quality: String,
}
