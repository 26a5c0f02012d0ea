use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::{
    error::ApiError,
    models::{
        CancelResponse, DownloaderHealth, HealthResponse, JobAcceptedResponse, MetadataQuery,
        StartPlaylistRequest, StartVideoRequest,
    },
    state::AppState,
};

/// Request bodies are a URL and a selector; anything near this size is not a real request
const MAX_PAYLOAD_SIZE: usize = 16 * 1024;

/// Start a single-video download (POST /jobs/video)
///
/// Responds 202 as soon as the job is registered. Whether yt-dlp is installed
/// or the URL resolves only shows up later in the job's status.
pub async fn start_video(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: StartVideoRequest = parse_body(&body)?;

    let job_id = state.service.start_video(
        &request.url,
        request.format.as_deref(),
        request.audio_only,
    )?;
    info!(%job_id, audio_only = request.audio_only, "Video job accepted");

    Ok((StatusCode::ACCEPTED, Json(JobAcceptedResponse { job_id })))
}

/// Start a playlist download (POST /jobs/playlist)
pub async fn start_playlist(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: StartPlaylistRequest = parse_body(&body)?;

    let job_id = state.service.start_playlist(&request.url)?;
    info!(%job_id, "Playlist job accepted");

    Ok((StatusCode::ACCEPTED, Json(JobAcceptedResponse { job_id })))
}

/// GET /jobs
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.list())
}

/// GET /jobs/{job_id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.service.get_status(&job_id)?;
    Ok((StatusCode::OK, Json(snapshot)))
}

/// Request cancellation (POST /jobs/{job_id}/cancel)
///
/// Always 200; `cancelled` says whether the job exists. A running job
/// reports `cancelled` status only once its worker notices the request.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let cancelled = state.service.cancel(&job_id);
    if !cancelled {
        warn!(%job_id, "Cancel requested for unknown job");
    }

    Json(CancelResponse { job_id, cancelled })
}

/// Metadata lookup without downloading (GET /metadata?url=...)
pub async fn get_metadata(
    State(state): State<AppState>,
    query: Result<Query<MetadataQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;

    let metadata = state.service.get_metadata(&query.url).await?;
    Ok(Json(metadata))
}

/// Health check endpoint (GET /health)
///
/// Probes the yt-dlp binary. Returns 503 when it cannot be run, since every
/// job would fail in that state.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let downloader = match state.service.probe().await {
        Ok(version) => DownloaderHealth {
            status: "healthy",
            version: Some(version),
            error: None,
        },
        Err(err) => DownloaderHealth {
            status: "unhealthy",
            version: None,
            error: Some(err.to_string()),
        },
    };

    let (status_code, overall) = if downloader.error.is_none() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status: overall,
        downloader,
        jobs: state.service.metrics().snapshot(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

/// Size-check and decode a JSON body
///
/// Decompression already happened in `RequestDecompressionLayer`.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.len() > MAX_PAYLOAD_SIZE {
        return Err(ApiError::PayloadTooLarge(body.len()));
    }

    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_defaults() {
        let request: StartVideoRequest =
            parse_body(br#"{"url": "https://youtu.be/abc"}"#).unwrap();
        assert_eq!(request.url, "https://youtu.be/abc");
        assert!(request.format.is_none());
        assert!(!request.audio_only);
    }

    #[test]
    fn test_parse_body_rejects_garbage_and_oversize() {
        assert!(matches!(
            parse_body::<StartPlaylistRequest>(b"{not json"),
            Err(ApiError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_body::<StartPlaylistRequest>(br#"{"link": "x"}"#),
            Err(ApiError::InvalidPayload(_))
        ));

        let huge = vec![b' '; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            parse_body::<StartPlaylistRequest>(&huge),
            Err(ApiError::PayloadTooLarge(_))
        ));
    }
}
