//! Job runner - drives one job through a single downloader call

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::record::{JobId, JobRecord, JobStatus, Resolution};
use super::registry::JobRegistry;
use crate::downloader::{
    Downloader, FetchError, FetchRequest, PlaylistPosition, ProgressEvent, Signal,
};
use crate::observability::Metrics;

/// Executes jobs off the request path, one tokio task per job
#[derive(Clone)]
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    downloader: Arc<dyn Downloader>,
    metrics: Arc<Metrics>,
}

impl JobRunner {
    pub fn new(
        registry: Arc<JobRegistry>,
        downloader: Arc<dyn Downloader>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            registry,
            downloader,
            metrics,
        }
    }

    /// Run the job on its own task; the handle yields the final status
    pub fn spawn(&self, id: JobId, request: FetchRequest) -> JoinHandle<Option<JobStatus>> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(id, request).await })
    }

    /// Drive `id` to a terminal status; `None` when the registry has no such job
    ///
    /// Downloader failures end up in the record, never in the return value.
    pub async fn run(&self, id: JobId, request: FetchRequest) -> Option<JobStatus> {
        let started = self.registry.with_record(&id, JobRecord::start)?;
        if !started {
            let status = self.registry.get(&id).map(|job| job.status);
            info!(job_id = %id, ?status, "Job left pending before it started");
            return status;
        }

        self.metrics.job_started();
        info!(job_id = %id, url = %request.url, playlist = request.is_playlist, "Job running");

        let registry = &self.registry;
        let mut on_progress = |event: ProgressEvent| {
            registry
                .with_record(&id, |record| observe(record, &event))
                .unwrap_or(Signal::Abort)
        };

        let outcome = self.downloader.fetch(&request, &mut on_progress).await;

        let resolution = match outcome {
            Ok(()) => Resolution::Completed,
            Err(FetchError::Cancelled) => Resolution::Cancelled,
            Err(err) => Resolution::Failed(err.to_string()),
        };

        let status = self.registry.with_record(&id, |record| {
            let resolution = if record.cancel_requested() {
                Resolution::Cancelled
            } else {
                resolution
            };
            record.resolve(resolution);
            record.snapshot()
        })?;

        self.metrics.job_finished(status.status);
        match status.status {
            JobStatus::Error => warn!(
                job_id = %id,
                progress = status.progress,
                error = status.error.as_deref().unwrap_or_default(),
                "Job failed"
            ),
            _ => info!(
                job_id = %id,
                status = %status.status,
                progress = status.progress,
                filename = status.filename.as_deref().unwrap_or_default(),
                "Job finished"
            ),
        }

        Some(status.status)
    }
}

/// Apply one progress event under the registry lock
///
/// The cancel flag is checked first: once it is up no further progress is
/// recorded and the downloader is told to stop.
fn observe(record: &mut JobRecord, event: &ProgressEvent) -> Signal {
    if record.cancel_requested() {
        return Signal::Abort;
    }

    match event {
        ProgressEvent::Downloading {
            downloaded_bytes,
            total_bytes,
            item,
        } => {
            if let Some(percent) = download_percent(*downloaded_bytes, *total_bytes, *item) {
                record.advance_progress(percent);
            }
        }
        ProgressEvent::Finished { filename, item } => {
            record.advance_progress(overall_percent(1.0, *item));
            if let Some(filename) = filename {
                record.record_filename(filename);
            }
        }
        ProgressEvent::Idle => {}
    }

    Signal::Continue
}

/// `None` when the total is unknown or zero
pub fn download_percent(
    downloaded: u64,
    total: Option<u64>,
    item: Option<PlaylistPosition>,
) -> Option<f64> {
    let total = total.filter(|total| *total > 0)?;
    let fraction = (downloaded as f64 / total as f64).clamp(0.0, 1.0);
    Some(overall_percent(fraction, item))
}

/// Map an item fraction onto the whole job; playlist items share 100% evenly
fn overall_percent(fraction: f64, item: Option<PlaylistPosition>) -> f64 {
    let percent = match item {
        Some(PlaylistPosition { index, count }) if count > 1 => {
            (f64::from(index.saturating_sub(1)) + fraction) / f64::from(count) * 100.0
        }
        _ => fraction * 100.0,
    };
    percent.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{ProgressCallback, VideoMetadata};
    use crate::jobs::JobKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed event list, then returns `result`
    struct Replay {
        events: Vec<ProgressEvent>,
        result: Mutex<Option<Result<(), FetchError>>>,
        signals: Mutex<Vec<Signal>>,
    }

    impl Replay {
        fn new(events: Vec<ProgressEvent>, result: Result<(), FetchError>) -> Arc<Self> {
            Arc::new(Self {
                events,
                result: Mutex::new(Some(result)),
                signals: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Downloader for Replay {
        async fn fetch(
            &self,
            _request: &FetchRequest,
            on_progress: ProgressCallback<'_>,
        ) -> Result<(), FetchError> {
            for event in &self.events {
                let signal = on_progress(event.clone());
                self.signals.lock().unwrap().push(signal);
                if signal == Signal::Abort {
                    return Err(FetchError::Cancelled);
                }
            }
            self.result.lock().unwrap().take().unwrap_or(Ok(()))
        }

        async fn query_metadata(&self, _url: &str) -> Result<VideoMetadata, FetchError> {
            Err(FetchError::Unavailable("replay".into()))
        }

        async fn probe(&self) -> Result<String, FetchError> {
            Ok("replay".into())
        }
    }

    fn downloading(downloaded: u64, total: Option<u64>) -> ProgressEvent {
        ProgressEvent::Downloading {
            downloaded_bytes: downloaded,
            total_bytes: total,
            item: None,
        }
    }

    fn request() -> FetchRequest {
        FetchRequest {
            url: "https://youtu.be/abc".into(),
            is_playlist: false,
            format: None,
            output_template: "%(title)s.%(ext)s".into(),
            audio_only: false,
        }
    }

    fn setup(downloader: Arc<Replay>) -> (JobRunner, Arc<JobRegistry>, JobId) {
        let registry = Arc::new(JobRegistry::new());
        let id = registry.create(JobKind::Video, "https://youtu.be/abc").job_id;
        let runner = JobRunner::new(registry.clone(), downloader, Arc::new(Metrics::new()));
        (runner, registry, id)
    }

    #[test]
    fn test_download_percent() {
        assert_eq!(download_percent(50, Some(200), None), Some(25.0));
        assert_eq!(download_percent(300, Some(200), None), Some(100.0));
        assert_eq!(download_percent(50, Some(0), None), None);
        assert_eq!(download_percent(50, None, None), None);
    }

    #[test]
    fn test_playlist_percent_spans_items() {
        let second_of_four = Some(PlaylistPosition { index: 2, count: 4 });
        assert_eq!(download_percent(50, Some(100), second_of_four), Some(37.5));
        assert_eq!(overall_percent(1.0, Some(PlaylistPosition { index: 4, count: 4 })), 100.0);
        assert_eq!(overall_percent(0.5, Some(PlaylistPosition { index: 1, count: 1 })), 50.0);
    }

    #[tokio::test]
    async fn test_completed_with_filename() {
        let downloader = Replay::new(
            vec![
                downloading(50, Some(200)),
                ProgressEvent::Finished {
                    filename: Some("clip.mp4".into()),
                    item: None,
                },
            ],
            Ok(()),
        );
        let (runner, registry, id) = setup(downloader);

        assert_eq!(runner.run(id, request()).await, Some(JobStatus::Completed));

        let job = registry.get(&id).unwrap();
        assert_eq!(job.progress, 100.0);
        assert_eq!(job.filename.as_deref(), Some("clip.mp4"));
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_total_leaves_progress() {
        let downloader = Replay::new(
            vec![
                downloading(50, Some(200)),
                downloading(80, None),
                downloading(90, Some(0)),
            ],
            Err(FetchError::Failed("HTTP Error 503".into())),
        );
        let (runner, registry, id) = setup(downloader);

        assert_eq!(runner.run(id, request()).await, Some(JobStatus::Error));

        let job = registry.get(&id).unwrap();
        assert_eq!(job.progress, 25.0);
        assert!(job.error.unwrap().contains("HTTP Error 503"));
    }

    #[tokio::test]
    async fn test_abort_signal_resolves_cancelled() {
        struct CancelMidway {
            registry: Arc<JobRegistry>,
            id: JobId,
        }

        #[async_trait]
        impl Downloader for CancelMidway {
            async fn fetch(
                &self,
                _request: &FetchRequest,
                on_progress: ProgressCallback<'_>,
            ) -> Result<(), FetchError> {
                assert_eq!(on_progress(downloading(10, Some(100))), Signal::Continue);
                assert!(self.registry.request_cancel(&self.id));
                if on_progress(downloading(60, Some(100))) == Signal::Abort {
                    return Err(FetchError::Cancelled);
                }
                Ok(())
            }

            async fn query_metadata(&self, _url: &str) -> Result<VideoMetadata, FetchError> {
                unreachable!()
            }

            async fn probe(&self) -> Result<String, FetchError> {
                unreachable!()
            }
        }

        let registry = Arc::new(JobRegistry::new());
        let id = registry.create(JobKind::Video, "https://youtu.be/abc").job_id;
        let downloader = Arc::new(CancelMidway {
            registry: registry.clone(),
            id,
        });
        let runner = JobRunner::new(registry.clone(), downloader, Arc::new(Metrics::new()));

        assert_eq!(runner.run(id, request()).await, Some(JobStatus::Cancelled));

        let job = registry.get(&id).unwrap();
        assert_eq!(job.progress, 10.0);
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_flag_wins_over_success() {
        struct IgnoresAbort {
            registry: Arc<JobRegistry>,
            id: JobId,
        }

        #[async_trait]
        impl Downloader for IgnoresAbort {
            async fn fetch(
                &self,
                _request: &FetchRequest,
                _on_progress: ProgressCallback<'_>,
            ) -> Result<(), FetchError> {
                self.registry.request_cancel(&self.id);
                Ok(())
            }

            async fn query_metadata(&self, _url: &str) -> Result<VideoMetadata, FetchError> {
                unreachable!()
            }

            async fn probe(&self) -> Result<String, FetchError> {
                unreachable!()
            }
        }

        let registry = Arc::new(JobRegistry::new());
        let id = registry.create(JobKind::Video, "https://youtu.be/abc").job_id;
        let downloader = Arc::new(IgnoresAbort {
            registry: registry.clone(),
            id,
        });
        let runner = JobRunner::new(registry.clone(), downloader, Arc::new(Metrics::new()));

        assert_eq!(runner.run(id, request()).await, Some(JobStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_download() {
        let downloader = Replay::new(vec![downloading(10, Some(100))], Ok(()));
        let (runner, registry, id) = setup(downloader.clone());

        assert!(registry.request_cancel(&id));

        assert_eq!(runner.run(id, request()).await, Some(JobStatus::Cancelled));
        assert!(downloader.signals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let downloader = Replay::new(vec![], Ok(()));
        let (runner, _registry, _id) = setup(downloader);

        assert_eq!(runner.run(JobId::new(), request()).await, None);
    }

    #[tokio::test]
    async fn test_spawned_runner_reports_final_status() {
        let downloader = Replay::new(vec![downloading(1, Some(2))], Ok(()));
        let (runner, registry, id) = setup(downloader);

        let handle = runner.spawn(id, request());

        assert_eq!(handle.await.unwrap(), Some(JobStatus::Completed));
        assert_eq!(registry.get(&id).unwrap().progress, 50.0);
    }
}
