//! Finished clip listing.

use std::path::Path;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use vtrim_models::CLIP_EXTENSION;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClipListResponse {
    pub clips: Vec<String>,
}

/// List clip files present in the clips directory.
///
/// This is a plain directory listing: it knows nothing about jobs, so a
/// clip shows up as soon as its file exists.
pub async fn list_clips(State(state): State<AppState>) -> ApiResult<Json<ClipListResponse>> {
    let clips = read_clip_names(state.coordinator.clips_dir())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read clips directory: {}", e)))?;
    Ok(Json(ClipListResponse { clips }))
}

async fn read_clip_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_clip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(CLIP_EXTENSION));
        if !is_clip || !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_only_clip_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b-2-1.mp4", "a-1-0.mp4", "notes.txt", "partial.mkv"] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        tokio::fs::create_dir(dir.path().join("dir.mp4")).await.unwrap();

        let names = read_clip_names(dir.path()).await.unwrap();
        assert_eq!(names, vec!["a-1-0.mp4", "b-2-1.mp4"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let names = read_clip_names(&dir.path().join("absent")).await.unwrap();
        assert!(names.is_empty());
    }
}
