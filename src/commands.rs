//! Foreground commands: `fetch`, `metadata`, `check`

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use mediafetch::config::Config;
use mediafetch::downloader::YtDlpDownloader;
use mediafetch::jobs::JobStatus;
use mediafetch::service::DownloadService;

use crate::cli::{FetchArgs, MetadataArgs};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

const STATUS_POLL: Duration = Duration::from_millis(500);

fn service(config: &Config) -> DownloadService {
    let downloader = Arc::new(YtDlpDownloader::new(config.downloader.clone()));
    DownloadService::new(downloader, config.downloader.output_template.clone())
}

/// Run one job to completion, logging progress; Ctrl+C requests cancellation
pub async fn fetch(config: &Config, args: FetchArgs) -> Result<ExitCode, AnyError> {
    let service = service(config);
    let job_id = if args.playlist {
        service.start_playlist(&args.url)?
    } else {
        service.start_video(&args.url, args.format.as_deref(), args.audio_only)?
    };
    let id = job_id.to_string();
    info!(%job_id, url = %args.url, "Download started");

    let mut ticker = interval(STATUS_POLL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_progress = -1.0;
    let mut cancel_sent = false;

    let job = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let job = service.get_status(&id)?;
                if job.status.is_terminal() {
                    break job;
                }
                if job.progress != last_progress {
                    last_progress = job.progress;
                    info!(progress = job.progress, "Downloading");
                }
            }
            signal = tokio::signal::ctrl_c(), if !cancel_sent => {
                signal?;
                cancel_sent = true;
                service.cancel(&id);
                warn!(%job_id, "Cancellation requested");
            }
        }
    };

    match job.status {
        JobStatus::Completed => {
            info!(
                filename = job.filename.as_deref().unwrap_or("-"),
                "Download completed"
            );
            Ok(ExitCode::SUCCESS)
        }
        JobStatus::Cancelled => {
            warn!("Download cancelled");
            Ok(ExitCode::from(130))
        }
        _ => {
            error!(error = job.error.as_deref().unwrap_or("unknown"), "Download failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print the metadata document to stdout
pub async fn metadata(config: &Config, args: MetadataArgs) -> Result<ExitCode, AnyError> {
    let metadata = service(config).get_metadata(&args.url).await?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(ExitCode::SUCCESS)
}

pub async fn check(config: &Config) -> Result<ExitCode, AnyError> {
    match service(config).probe().await {
        Ok(version) => {
            info!(%version, binary = %config.downloader.binary.display(), "yt-dlp is available");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(error = %err, "yt-dlp is not usable");
            Ok(ExitCode::FAILURE)
        }
    }
}
