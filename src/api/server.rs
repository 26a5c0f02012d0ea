use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{info, warn};

use super::{
    services::{cancel_job, get_job, get_metadata, health, list_jobs, start_playlist, start_video},
    state::AppState,
};
use crate::config::Config;
use crate::downloader::{Downloader, YtDlpDownloader};
use crate::service::DownloadService;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes with middleware attached
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/video", post(start_video))
        .route("/jobs/playlist", post(start_playlist))
        .route("/jobs/{job_id}", get(get_job))
        .route("/jobs/{job_id}/cancel", post(cancel_job))
        .route("/metadata", get(get_metadata))
        .route("/health", get(health))
        .with_state(state)
        // gzip request bodies are decoded before handlers see them
        .layer(RequestDecompressionLayer::new())
}

/// Serve the API until Ctrl+C or SIGTERM
///
/// `address` overrides `server.bind_addr` from the config.
pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);

    let downloader = Arc::new(YtDlpDownloader::new(config.downloader.clone()));
    match downloader.probe().await {
        Ok(version) => info!(%version, binary = %config.downloader.binary.display(), "yt-dlp found"),
        Err(err) => warn!(error = %err, "yt-dlp probe failed; jobs will error until it is installed"),
    }

    info!(
        output_dir = %config.downloader.output_dir.display(),
        template = %config.downloader.output_template,
        "Downloads configured"
    );
    let service = DownloadService::new(downloader, config.downloader.output_template.clone());
    let app = router(AppState::new(service));

    let listener = TcpListener::bind(address).await?;
    info!(%address, "mediafetch API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received; in-flight downloads are abandoned");
}
