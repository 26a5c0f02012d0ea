use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// External downloader (yt-dlp) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// Executable name or path of yt-dlp
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Directory the output template is resolved under
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// yt-dlp output template, e.g. `%(title)s.%(ext)s`
    #[serde(default = "default_output_template")]
    pub output_template: String,
    #[serde(default = "default_merge_output_format")]
    pub merge_output_format: String,
    #[serde(default = "default_concurrent_fragments")]
    pub concurrent_fragments: u32,
    /// Skip files larger than this (forwarded as `--max-filesize`)
    #[serde(default)]
    pub max_filesize: Option<ByteSize>,
    /// Directory or binary path of ffmpeg, used for merging and audio extraction
    #[serde(default)]
    pub ffmpeg_location: Option<PathBuf>,
    /// Target codec when a job asks for audio only
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    /// How often a silent download checks for cancellation
    #[serde(default = "default_cancel_poll_ms")]
    pub cancel_poll_ms: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            output_dir: default_output_dir(),
            output_template: default_output_template(),
            merge_output_format: default_merge_output_format(),
            concurrent_fragments: default_concurrent_fragments(),
            max_filesize: None,
            ffmpeg_location: None,
            audio_format: default_audio_format(),
            cancel_poll_ms: default_cancel_poll_ms(),
        }
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_output_template() -> String {
    "%(title)s.%(ext)s".to_string()
}

fn default_merge_output_format() -> String {
    "mp4".to_string()
}

fn default_concurrent_fragments() -> u32 {
    3
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_cancel_poll_ms() -> u64 {
    500
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Fallback filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
