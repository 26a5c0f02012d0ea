//! Request and response bodies for the HTTP surface
//!
//! Job bodies themselves come from [`crate::jobs::JobSnapshot`] (single job)
//! and [`crate::service::JobSummary`] (listing, no error text).
//!
//! ```json
//! POST /jobs/video
//! { "url": "https://www.youtube.com/watch?v=abc", "format": "bestaudio", "audio_only": true }
//!
//! 202 Accepted
//! { "job_id": "01928c6e-..." }
//! ```

use serde::{Deserialize, Serialize};

use crate::jobs::JobId;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Deserialize, Clone)]
pub struct StartVideoRequest {
    pub url: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub audio_only: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StartPlaylistRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobAcceptedResponse {
    pub job_id: JobId,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CancelResponse {
    pub job_id: String,
    pub cancelled: bool,
}

#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DownloaderHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub downloader: DownloaderHealth,
    pub jobs: MetricsSnapshot,
    pub version: String,
}
