//! Upload intake.
//!
//! `POST /process-video` takes a multipart body with a `video` file field and
//! a `clips` field holding a JSON array of `{name, start, end}`. The video is
//! streamed to the upload directory chunk by chunk, the clips are validated,
//! and the job is handed to the coordinator. The response is sent before any
//! clip has been cut.
//!
//! A rejected submission never leaves its stored upload behind.

use std::io;
use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use vtrim_models::{validate_clips, RawClip};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the source video.
pub const VIDEO_FIELD: &str = "video";
/// Multipart field carrying the JSON clip list.
pub const CLIPS_FIELD: &str = "clips";

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub job_id: String,
    pub clip_count: usize,
}

/// Accept an upload and start extracting its clips in the background.
pub async fn process_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let mut stored = None;
    let result = accept_upload(&state, multipart, &mut stored).await;

    if let Err(e) = &result {
        metrics::record_upload_rejected(e.status_code().as_u16());
        if let Some(path) = stored {
            discard_upload(&path).await;
        }
    }
    result
}

async fn accept_upload(
    state: &AppState,
    mut multipart: Multipart,
    stored: &mut Option<PathBuf>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let mut clips_json: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some(VIDEO_FIELD) => {
                if stored.is_some() {
                    return Err(ApiError::bad_request("Only one video file may be uploaded"));
                }
                let extension = upload_extension(field.file_name());
                let (path, file) = create_upload_file(state.coordinator.upload_dir(), &extension)
                    .await
                    .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;
                *stored = Some(path.clone());

                let written = stream_to_file(field, file).await?;
                if written == 0 {
                    return Err(ApiError::bad_request("Uploaded video file is empty"));
                }
                metrics::record_upload_bytes(written);
                info!(path = %path.display(), bytes = written, "Stored upload");
            }
            Some(CLIPS_FIELD) => {
                clips_json = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let source = stored
        .clone()
        .ok_or_else(|| ApiError::bad_request("No video file uploaded"))?;

    let raw: Vec<RawClip> = match clips_json.as_deref() {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| ApiError::bad_request(format!("Invalid clips JSON: {}", e)))?,
        None => Vec::new(),
    };
    let clips = validate_clips(&raw)?;

    let ack = state.coordinator.submit(source, clips).await?;
    info!(job_id = %ack.job_id, clip_count = ack.clip_count, "Job accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted",
            job_id: ack.job_id.to_string(),
            clip_count: ack.clip_count,
        }),
    ))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::bad_request(format!("Invalid multipart request: {}", e.body_text()))
    }
}

/// Extension of the client's file name, dot included, if it is plain
/// alphanumeric. Anything else is dropped.
fn upload_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Create `original-{millis}{ext}` in `dir`, stepping the millis forward if
/// another upload already took the name.
async fn create_upload_file(dir: &Path, extension: &str) -> io::Result<(PathBuf, File)> {
    let base = Utc::now().timestamp_millis();
    for offset in 0..1000 {
        let path = dir.join(format!("original-{}{}", base + offset, extension));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free upload file name",
    ))
}

async fn stream_to_file(mut field: Field<'_>, mut file: File) -> ApiResult<u64> {
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to write upload: {}", e)))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to write upload: {}", e)))?;
    Ok(written)
}

async fn discard_upload(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "Removed rejected upload"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to remove rejected upload: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension(Some("input.mp4")), ".mp4");
        assert_eq!(upload_extension(Some("Holiday.MOV")), ".mov");
        assert_eq!(upload_extension(Some("noext")), "");
        assert_eq!(upload_extension(Some("weird.m p4")), "");
        assert_eq!(upload_extension(None), "");
    }

    #[tokio::test]
    async fn test_create_upload_file_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let (first, _) = create_upload_file(dir.path(), ".mp4").await.unwrap();
        let (second, _) = create_upload_file(dir.path(), ".mp4").await.unwrap();

        assert_ne!(first, second);
        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("original-"));
        assert!(name.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_discard_missing_upload_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        discard_upload(&dir.path().join("gone.mp4")).await;
    }
}
