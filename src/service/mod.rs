//! Protocol-agnostic job operations
//!
//! [`DownloadService`] is the single entry point both the HTTP surface and the
//! CLI go through. It owns no job state of its own: every call is translated
//! into registry lookups or a spawned [`JobRunner`].
//!
//! | Operation | Method |
//! |---|---|
//! | start-video | [`DownloadService::start_video`] |
//! | start-playlist | [`DownloadService::start_playlist`] |
//! | get-status | [`DownloadService::get_status`] |
//! | cancel | [`DownloadService::cancel`] |
//! | list | [`DownloadService::list`] |
//! | get-metadata | [`DownloadService::get_metadata`] |

mod validation;

pub use validation::{
    MAX_FORMAT_BYTES, MAX_URL_BYTES, RequestValidationError, validate_format, validate_url,
};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::downloader::{Downloader, FetchError, FetchRequest, VideoMetadata};
use crate::jobs::{JobId, JobKind, JobRegistry, JobRunner, JobSnapshot, JobStatus};
use crate::observability::Metrics;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestValidationError),
    #[error("downloader unavailable: {0}")]
    CollaboratorUnavailable(String),
    #[error("downloader failed: {0}")]
    Upstream(String),
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unavailable(msg) => ServiceError::CollaboratorUnavailable(msg),
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}

/// Listing entry; a [`JobSnapshot`] without the error text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub kind: JobKind,
    pub url: String,
    pub status: JobStatus,
    pub progress: f64,
    pub filename: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

impl From<JobSnapshot> for JobSummary {
    fn from(job: JobSnapshot) -> Self {
        Self {
            job_id: job.job_id,
            kind: job.kind,
            url: job.url,
            status: job.status,
            progress: job.progress,
            filename: job.filename,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

pub struct DownloadService {
    registry: Arc<JobRegistry>,
    runner: JobRunner,
    downloader: Arc<dyn Downloader>,
    metrics: Arc<Metrics>,
    output_template: String,
}

impl DownloadService {
    pub fn new(downloader: Arc<dyn Downloader>, output_template: impl Into<String>) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let metrics = Arc::new(Metrics::new());
        let runner = JobRunner::new(registry.clone(), downloader.clone(), metrics.clone());

        Self {
            registry,
            runner,
            downloader,
            metrics,
            output_template: output_template.into(),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Create a video job and start it in the background
    ///
    /// Returns as soon as the job is registered. Must be called inside a tokio runtime.
    pub fn start_video(
        &self,
        url: &str,
        format: Option<&str>,
        audio_only: bool,
    ) -> Result<JobId, ServiceError> {
        let url = validate_url(url)?;
        let format = validate_format(format)?;

        Ok(self.launch(
            JobKind::Video,
            FetchRequest {
                url: url.to_string(),
                is_playlist: false,
                format,
                output_template: self.output_template.clone(),
                audio_only,
            },
        ))
    }

    /// Create a playlist job and start it in the background
    pub fn start_playlist(&self, url: &str) -> Result<JobId, ServiceError> {
        let url = validate_url(url)?;

        Ok(self.launch(
            JobKind::Playlist,
            FetchRequest {
                url: url.to_string(),
                is_playlist: true,
                format: None,
                output_template: self.output_template.clone(),
                audio_only: false,
            },
        ))
    }

    pub fn get_status(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        job_id
            .parse::<JobId>()
            .ok()
            .and_then(|id| self.registry.get(&id))
            .ok_or_else(|| ServiceError::NotFound(job_id.to_string()))
    }

    /// Whether the job exists; a malformed id is simply not found
    pub fn cancel(&self, job_id: &str) -> bool {
        job_id
            .parse::<JobId>()
            .is_ok_and(|id| self.registry.request_cancel(&id))
    }

    pub fn list(&self) -> Vec<JobSummary> {
        self.registry.list().into_iter().map(JobSummary::from).collect()
    }

    /// Metadata-only lookup; creates no job
    pub async fn get_metadata(&self, url: &str) -> Result<VideoMetadata, ServiceError> {
        let url = validate_url(url)?;
        Ok(self.downloader.query_metadata(url).await?)
    }

    /// Version of the external downloader, or why it cannot be used
    pub async fn probe(&self) -> Result<String, ServiceError> {
        Ok(self.downloader.probe().await?)
    }

    /// Poll until the job reaches a terminal status
    pub async fn wait_for_terminal(
        &self,
        id: &JobId,
        every: Duration,
    ) -> Result<JobSnapshot, ServiceError> {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let job = self
                .registry
                .get(id)
                .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
            if job.status.is_terminal() {
                return Ok(job);
            }
        }
    }

    fn launch(&self, kind: JobKind, request: FetchRequest) -> JobId {
        let job = self.registry.create(kind, request.url.clone());
        self.metrics.job_created();
        self.runner.spawn(job.job_id, request);
        job.job_id
    }
}
