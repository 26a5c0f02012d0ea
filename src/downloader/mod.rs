//! External downloader boundary
//!
//! The job runner never fetches media itself. It hands a [`FetchRequest`] and a
//! progress callback to a [`Downloader`], which reports [`ProgressEvent`]s while it
//! works. Every callback returns a [`Signal`]; [`Signal::Abort`] asks the downloader
//! to stop and resolve with [`FetchError::Cancelled`].
//!
//! - [`YtDlpDownloader`] - drives the `yt-dlp` CLI as a child process
//! - [`VideoMetadata`] - metadata-only query result

mod progress;
mod ytdlp;

pub use ytdlp::YtDlpDownloader;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The progress callback returned [`Signal::Abort`]
    #[error("cancelled by user")]
    Cancelled,

    #[error("downloader unavailable: {0}")]
    Unavailable(String),

    #[error("download failed: {0}")]
    Failed(String),

    #[error("unexpected downloader output: {0}")]
    InvalidOutput(String),
}

/// Verdict a progress callback hands back to the fetch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Abort,
}

/// Position of the current item inside a playlist (1-based index)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistPosition {
    pub index: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        downloaded_bytes: u64,
        /// `None` when the downloader cannot tell the size yet
        total_bytes: Option<u64>,
        item: Option<PlaylistPosition>,
    },
    Finished {
        filename: Option<String>,
        item: Option<PlaylistPosition>,
    },
    /// No output for a while; gives the callback a chance to abort
    Idle,
}

/// Options for a single fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub is_playlist: bool,
    pub format: Option<String>,
    /// Output template, e.g. `%(title)s.%(ext)s`
    pub output_template: String,
    pub audio_only: bool,
}

/// Progress callback handed to [`Downloader::fetch`]
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(ProgressEvent) -> Signal + Send);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub webpage_url: Option<String>,
    /// First three thumbnails as reported by the extractor
    #[serde(default)]
    pub thumbnails: Vec<Value>,
}

impl VideoMetadata {
    pub const MAX_THUMBNAILS: usize = 3;

    /// Reduce a full extractor info document to the fields callers need
    pub fn from_info(info: &Value) -> Self {
        let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_owned);

        Self {
            id: text("id"),
            title: text("title"),
            uploader: text("uploader"),
            duration: info.get("duration").and_then(Value::as_f64),
            webpage_url: text("webpage_url"),
            thumbnails: info
                .get("thumbnails")
                .and_then(Value::as_array)
                .map(|all| all.iter().take(Self::MAX_THUMBNAILS).cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// Media fetcher the job runner delegates to
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `request.url`, reporting progress through `on_progress`
    ///
    /// Must return [`FetchError::Cancelled`] when a callback returned
    /// [`Signal::Abort`], and never for any other reason.
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), FetchError>;

    /// Look up metadata without downloading anything
    async fn query_metadata(&self, url: &str) -> Result<VideoMetadata, FetchError>;

    /// Check that the tool is installed; returns its version string
    async fn probe(&self) -> Result<String, FetchError>;
}
