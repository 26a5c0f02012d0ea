#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request};
use serde_json::Value;
use tokio::sync::Notify;

use mediafetch::api::{router, state::AppState};
use mediafetch::downloader::{
    Downloader, FetchError, FetchRequest, ProgressCallback, ProgressEvent, Signal, VideoMetadata,
};
use mediafetch::jobs::{JobId, JobSnapshot};
use mediafetch::service::DownloadService;

/// One step of a scripted download
#[derive(Debug, Clone)]
pub enum Step {
    Event(ProgressEvent),
    /// Keep polling with idle ticks until released or aborted
    Hold,
    Fail(String),
}

/// Downloader double that replays a fixed script for every fetch
pub struct ScriptedDownloader {
    steps: Vec<Step>,
    release: Arc<Notify>,
    metadata: Option<VideoMetadata>,
    installed: bool,
}

impl ScriptedDownloader {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            release: Arc::new(Notify::new()),
            metadata: None,
            installed: true,
        }
    }

    pub fn with_metadata(mut self, metadata: VideoMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn not_installed(mut self) -> Self {
        self.installed = false;
        self
    }

    /// Lets the next held step continue
    pub fn release(&self) -> Arc<Notify> {
        self.release.clone()
    }

    fn ensure_installed(&self) -> Result<(), FetchError> {
        if self.installed {
            Ok(())
        } else {
            Err(FetchError::Unavailable("cannot run yt-dlp: not found".into()))
        }
    }
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn fetch(
        &self,
        _request: &FetchRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), FetchError> {
        self.ensure_installed()?;

        for step in &self.steps {
            match step {
                Step::Event(event) => {
                    if on_progress(event.clone()) == Signal::Abort {
                        return Err(FetchError::Cancelled);
                    }
                    tokio::task::yield_now().await;
                }
                Step::Hold => loop {
                    if on_progress(ProgressEvent::Idle) == Signal::Abort {
                        return Err(FetchError::Cancelled);
                    }
                    let released =
                        tokio::time::timeout(Duration::from_millis(5), self.release.notified());
                    if released.await.is_ok() {
                        break;
                    }
                },
                Step::Fail(message) => return Err(FetchError::Failed(message.clone())),
            }
        }

        Ok(())
    }

    async fn query_metadata(&self, _url: &str) -> Result<VideoMetadata, FetchError> {
        self.ensure_installed()?;
        self.metadata
            .clone()
            .ok_or_else(|| FetchError::Failed("Video unavailable".into()))
    }

    async fn probe(&self) -> Result<String, FetchError> {
        self.ensure_installed()?;
        Ok("2025.01.15".to_string())
    }
}

pub fn downloading(downloaded_bytes: u64, total_bytes: u64) -> Step {
    Step::Event(ProgressEvent::Downloading {
        downloaded_bytes,
        total_bytes: Some(total_bytes),
        item: None,
    })
}

pub fn finished(filename: &str) -> Step {
    Step::Event(ProgressEvent::Finished {
        filename: Some(filename.to_string()),
        item: None,
    })
}

/// Router plus a handle on the service behind it
pub fn build_test_app(downloader: ScriptedDownloader) -> (Router, Arc<DownloadService>) {
    let service = DownloadService::new(Arc::new(downloader), "%(title)s.%(ext)s");
    let state = AppState::new(service);
    let service = state.service.clone();
    (router(state), service)
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Poll the registry until the job is terminal (bounded so a bug fails fast)
pub async fn wait_terminal(service: &DownloadService, id: &JobId) -> JobSnapshot {
    tokio::time::timeout(
        Duration::from_secs(5),
        service.wait_for_terminal(id, Duration::from_millis(5)),
    )
    .await
    .expect("job did not finish in time")
    .unwrap()
}

/// Poll until `check` holds for the job snapshot
pub async fn wait_until(
    service: &DownloadService,
    id: &JobId,
    check: impl Fn(&JobSnapshot) -> bool,
) -> JobSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let job = service.registry().get(id).unwrap();
            if check(&job) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}
