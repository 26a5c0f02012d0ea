//! yt-dlp child-process driver

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::progress::{self, error_message, parse_line};
use super::{
    Downloader, FetchError, FetchRequest, ProgressCallback, ProgressEvent, Signal, VideoMetadata,
};
use crate::config::DownloaderConfig;

/// Lines buffered between the pipe readers and the fetch loop
const LINE_BUFFER: usize = 64;

pub struct YtDlpDownloader {
    config: DownloaderConfig,
}

impl YtDlpDownloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// Full argument list for one fetch, URL last
    pub fn fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let output = self.config.output_dir.join(&request.output_template);

        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--progress".into(),
            "--no-warnings".into(),
            "--progress-template".into(),
            progress::progress_template(),
            "--print".into(),
            progress::file_template(),
            "-o".into(),
            output.to_string_lossy().into_owned(),
            "--merge-output-format".into(),
            self.config.merge_output_format.clone(),
            "--concurrent-fragments".into(),
            self.config.concurrent_fragments.to_string(),
        ];

        if request.is_playlist {
            args.extend(["--yes-playlist".to_string(), "--ignore-errors".to_string()]);
        } else {
            args.push("--no-playlist".to_string());
        }

        if let Some(format) = &request.format {
            args.extend(["-f".to_string(), format.clone()]);
        }

        if request.audio_only {
            args.extend([
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                self.config.audio_format.clone(),
            ]);
        }

        if let Some(limit) = self.config.max_filesize {
            args.extend(["--max-filesize".to_string(), limit.as_u64().to_string()]);
        }

        if let Some(ffmpeg) = &self.config.ffmpeg_location {
            args.extend([
                "--ffmpeg-location".to_string(),
                ffmpeg.to_string_lossy().into_owned(),
            ]);
        }

        args.extend(["--".to_string(), request.url.clone()]);
        args
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), FetchError> {
        let mut child = self
            .command()
            .args(self.fetch_args(request))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.config.binary, e))?;

        info!(url = %request.url, playlist = request.is_playlist, pid = ?child.id(), "yt-dlp started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::InvalidOutput("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::InvalidOutput("stderr not captured".into()))?;

        let (tx, mut lines) = mpsc::channel(LINE_BUFFER);
        tokio::spawn(forward_lines(stdout, tx.clone()));
        tokio::spawn(forward_lines(stderr, tx));

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.cancel_poll_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut last_error: Option<String> = None;

        loop {
            let event = tokio::select! {
                line = lines.recv() => match line {
                    Some(line) => {
                        if let Some(msg) = error_message(&line) {
                            last_error = Some(msg.to_owned());
                        }
                        match parse_line(&line) {
                            Some(event) => event,
                            None => continue,
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => ProgressEvent::Idle,
            };

            if on_progress(event) == Signal::Abort {
                debug!(url = %request.url, "Abort signalled, stopping yt-dlp");
                if let Err(e) = child.start_kill() {
                    warn!(url = %request.url, error = %e, "Failed to kill yt-dlp");
                }
                if let Err(e) = child.wait().await {
                    warn!(url = %request.url, error = %e, "Failed to reap yt-dlp");
                }
                return Err(FetchError::Cancelled);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| FetchError::Failed(format!("waiting for yt-dlp: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(FetchError::Failed(
                last_error.unwrap_or_else(|| format!("yt-dlp exited with {status}")),
            ))
        }
    }

    async fn query_metadata(&self, url: &str) -> Result<VideoMetadata, FetchError> {
        let output = self
            .command()
            .args([
                "--dump-single-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--",
                url,
            ])
            .output()
            .await
            .map_err(|e| spawn_error(&self.config.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .filter_map(error_message)
                .last()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            return Err(FetchError::Failed(message));
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| FetchError::InvalidOutput(format!("metadata is not JSON: {e}")))?;

        Ok(VideoMetadata::from_info(&info))
    }

    async fn probe(&self) -> Result<String, FetchError> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .map_err(|e| spawn_error(&self.config.binary, e))?;

        if !output.status.success() {
            return Err(FetchError::Unavailable(format!(
                "{} --version exited with {}",
                self.config.binary.display(),
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Forward lines until EOF; bytes that are not UTF-8 are replaced, never fatal
///
/// Stopping early would close the pipe and kill yt-dlp with SIGPIPE.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Reading yt-dlp output failed");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']).to_owned();
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

fn spawn_error(binary: &Path, err: io::Error) -> FetchError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FetchError::Unavailable(
            format!("cannot run {}: {err}", binary.display()),
        ),
        _ => FetchError::Failed(format!("failed to start {}: {err}", binary.display())),
    }
}
