//! Video handlers: upload, listing, streaming, analysis control.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use vguard_models::{VideoId, VideoRecord, VideoStatus, WsEvent};
use vguard_pipeline::StartOutcome;
use vguard_repo::VideoQuery;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// MIME types accepted for upload, with their storage extensions.
const ACCEPTED_MIME_TYPES: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/ogg", "ogv"),
    ("video/quicktime", "mov"),
];

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    ACCEPTED_MIME_TYPES
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
}

fn content_type_for_extension(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match ext {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct UploadResponse {
    pub video: VideoRecord,
}

/// POST /api/videos/upload
///
/// Multipart upload: text fields `title` and `description` plus one `file`
/// part. The file streams to a partial upload path and is moved into the
/// media store only once fully received; oversize or rejected uploads leave
/// nothing behind. Analysis starts automatically on success.
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut title: Option<String> = None;
    let mut description = String::new();
    let mut staged: Option<(PathBuf, &'static str, u64)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?,
                );
            }
            Some("description") => {
                description = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
            }
            Some("file") => {
                let mime = field
                    .content_type()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::bad_request("File part missing content type"))?;
                let ext = extension_for_mime(&mime).ok_or_else(|| {
                    ApiError::UnsupportedMediaType(format!("Unsupported video type: {mime}"))
                })?;

                let upload_dir = state.config.media_root.join("uploads");
                tokio::fs::create_dir_all(&upload_dir).await.map_err(|e| {
                    ApiError::internal(format!("Failed to prepare upload dir: {e}"))
                })?;
                let part_path = upload_dir.join(format!("{}.part", Uuid::new_v4()));

                let written =
                    stream_field_to_file(&mut field, &part_path, state.config.max_upload_size)
                        .await?;
                staged = Some((part_path, ext, written));
            }
            _ => {}
        }
    }

    let (part_path, ext, file_size) =
        staged.ok_or_else(|| ApiError::bad_request("Missing file part"))?;
    let title = match title {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(ApiError::Validation("Title is required".to_string()));
        }
    };

    let video_id = VideoId::new();
    let stored_path = state
        .media_store
        .ingest_video(&part_path, &video_id, ext)
        .await?;

    let record = VideoRecord::new(
        video_id.clone(),
        user.tenant_id.clone(),
        user.user_id.clone(),
        title,
        description,
        stored_path.to_string_lossy(),
        file_size,
    );

    let repo = state.repo(user.tenant_id.clone());
    if let Err(e) = repo.create(&record).await {
        // No record will ever point at the stored file; take it back out.
        let _ = tokio::fs::remove_file(&stored_path).await;
        return Err(e.into());
    }

    info!(video_id = %video_id, tenant = %user.tenant_id, size = file_size, "Video uploaded");
    state
        .events
        .publish_global(WsEvent::upload_complete(video_id.as_str()));

    // Fire and forget; failures surface over the event channel and logs.
    if let Err(e) = state
        .orchestrator
        .start_processing(user.tenant_id, video_id.clone())
        .await
    {
        warn!(video_id = %video_id, error = %e, "Failed to start analysis after upload");
    }

    let record = repo.get(&video_id).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { video: record })))
}

/// Stream one multipart field to disk, enforcing the size cap. The partial
/// file is removed on any failure.
async fn stream_field_to_file(
    field: &mut axum::extract::multipart::Field<'_>,
    path: &Path,
    max_size: usize,
) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create upload file: {e}")))?;
    let mut written: u64 = 0;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                let _ = tokio::fs::remove_file(path).await;
                return Err(ApiError::bad_request(format!("Upload aborted: {e}")));
            }
        };

        written += chunk.len() as u64;
        if written > max_size as u64 {
            let _ = tokio::fs::remove_file(path).await;
            return Err(ApiError::PayloadTooLarge(format!(
                "Upload exceeds limit of {max_size} bytes"
            )));
        }

        if let Err(e) = file.write_all(&chunk).await {
            let _ = tokio::fs::remove_file(path).await;
            return Err(ApiError::internal(format!("Failed to write upload: {e}")));
        }
    }

    if let Err(e) = file.flush().await {
        let _ = tokio::fs::remove_file(path).await;
        return Err(ApiError::internal(format!("Failed to flush upload: {e}")));
    }

    Ok(written)
}

// ---------------------------------------------------------------------------
// Listing and metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<VideoStatus>,
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoRecord>,
    pub total: usize,
}

/// GET /api/videos
pub async fn list_videos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<VideoListResponse>> {
    let repo = state.repo(user.tenant_id);
    let videos = repo
        .list(&VideoQuery {
            status: params.status,
            search: params.search,
        })
        .await?;
    let total = videos.len();
    Ok(Json(VideoListResponse { videos, total }))
}

/// GET /api/videos/:video_id
pub async fn get_video(
    State(state): State<AppState>,
    user: AuthUser,
    UrlPath(video_id): UrlPath<String>,
) -> ApiResult<Json<VideoRecord>> {
    let repo = state.repo(user.tenant_id);
    let record = repo.get(&VideoId::from(video_id)).await?;
    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// Parse a `Range: bytes=START-END` header value.
/// Returns `(start, optional_end)`.
fn parse_range_header(range: &str) -> Option<(u64, Option<u64>)> {
    let range = range.strip_prefix("bytes=")?;
    let parts: Vec<&str> = range.splitn(2, '-').collect();
    if parts.len() != 2 {
        return None;
    }
    let start = parts[0].parse::<u64>().ok()?;
    let end = if parts[1].is_empty() {
        None
    } else {
        Some(parts[1].parse::<u64>().ok()?)
    };
    Some((start, end))
}

/// GET /api/videos/:video_id/stream
///
/// Streams the stored file with HTTP range support. An open-ended range runs
/// to the end of the file; an unparsable or out-of-bounds range is answered
/// with 416 and the file size.
pub async fn stream_video(
    State(state): State<AppState>,
    user: AuthUser,
    UrlPath(video_id): UrlPath<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let repo = state.repo(user.tenant_id);
    let record = repo.get(&VideoId::from(video_id)).await?;

    let path = PathBuf::from(&record.file_path);
    if !path.exists() {
        return Err(ApiError::not_found("Video file missing from store"));
    }

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let file_size = metadata.len();
    let content_type = content_type_for_extension(&record.file_path);

    if let Some(range_value) = headers.get(header::RANGE) {
        let range_str = range_value
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Range header"))?;

        let Some((start, end)) = parse_range_header(range_str) else {
            return Ok(range_not_satisfiable(file_size));
        };
        if file_size == 0 {
            return Ok(range_not_satisfiable(file_size));
        }
        let end = end.map(|e| e.min(file_size - 1)).unwrap_or(file_size - 1);

        if start >= file_size || start > end {
            return Ok(range_not_satisfiable(file_size));
        }

        let length = end - start + 1;

        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;

        let limited = tokio::io::AsyncReadExt::take(file, length);
        let stream = ReaderStream::new(limited);

        return Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, length.to_string())
            .header(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{file_size}"),
            )
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::from_stream(stream))
            .map_err(|e| ApiError::internal(e.to_string()));
    }

    // No Range header, serve the full file.
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let stream = ReaderStream::new(file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(e.to_string()))
}

fn range_not_satisfiable(file_size: u64) -> Response {
    (
        StatusCode::RANGE_NOT_SATISFIABLE,
        [(header::CONTENT_RANGE, format!("bytes */{file_size}"))],
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// DELETE /api/videos/:video_id
///
/// Allowed for the uploader or a tenant admin. Removes the stored file, the
/// thumbnail, any leftover frames and the metadata record.
pub async fn delete_video(
    State(state): State<AppState>,
    user: AuthUser,
    UrlPath(video_id): UrlPath<String>,
) -> ApiResult<StatusCode> {
    let video_id = VideoId::from(video_id);
    let repo = state.repo(user.tenant_id.clone());
    let record = repo.get(&video_id).await?;

    if record.uploader_id != user.user_id && !user.is_admin() {
        return Err(ApiError::forbidden(
            "Only the uploader or an admin can delete a video",
        ));
    }

    state
        .media_store
        .remove_all(&video_id, Path::new(&record.file_path))
        .await?;
    repo.delete(&video_id).await?;

    info!(video_id = %video_id, tenant = %user.tenant_id, "Video deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Analysis control
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StartAnalysisResponse {
    pub video_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/videos/:video_id/analysis/start
///
/// Idempotent under concurrency: a second start while a run is in flight is
/// absorbed and answered with an already-running notice.
pub async fn start_analysis(
    State(state): State<AppState>,
    user: AuthUser,
    UrlPath(video_id): UrlPath<String>,
) -> ApiResult<(StatusCode, Json<StartAnalysisResponse>)> {
    let video_id = VideoId::from(video_id);
    let outcome = state
        .orchestrator
        .start_processing(user.tenant_id, video_id.clone())
        .await?;

    let response = match outcome {
        StartOutcome::Started => (
            StatusCode::ACCEPTED,
            Json(StartAnalysisResponse {
                video_id: video_id.to_string(),
                status: "started".to_string(),
                message: None,
            }),
        ),
        StartOutcome::AlreadyRunning => (
            StatusCode::OK,
            Json(StartAnalysisResponse {
                video_id: video_id.to_string(),
                status: "already-running".to_string(),
                message: Some("Analysis already running for this video".to_string()),
            }),
        ),
    };
    Ok(response)
}

// ---------------------------------------------------------------------------
// Views and title
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ViewsResponse {
    pub video_id: String,
    pub views: u64,
}

/// PATCH /api/videos/:video_id/view
pub async fn increment_views(
    State(state): State<AppState>,
    user: AuthUser,
    UrlPath(video_id): UrlPath<String>,
) -> ApiResult<Json<ViewsResponse>> {
    let video_id = VideoId::from(video_id);
    let repo = state.repo(user.tenant_id);
    let views = repo.increment_views(&video_id).await?;
    Ok(Json(ViewsResponse {
        video_id: video_id.to_string(),
        views,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
}

/// PATCH /api/videos/:video_id/title
pub async fn update_video_title(
    State(state): State<AppState>,
    user: AuthUser,
    UrlPath(video_id): UrlPath<String>,
    Json(body): Json<UpdateTitleRequest>,
) -> ApiResult<Json<VideoRecord>> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let repo = state.repo(user.tenant_id);
    let record = repo
        .update_title(&VideoId::from(video_id), body.title.trim())
        .await?;
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_header() {
        assert_eq!(
            parse_range_header("bytes=500000-599999"),
            Some((500_000, Some(599_999)))
        );
        assert_eq!(parse_range_header("bytes=999900-"), Some((999_900, None)));
        assert_eq!(parse_range_header("bytes=abc-"), None);
        assert_eq!(parse_range_header("items=0-10"), None);
        assert_eq!(parse_range_header("bytes=-500"), None);
    }

    #[test]
    fn test_mime_to_extension() {
        assert_eq!(extension_for_mime("video/mp4"), Some("mp4"));
        assert_eq!(extension_for_mime("video/webm"), Some("webm"));
        assert_eq!(extension_for_mime("video/ogg"), Some("ogv"));
        assert_eq!(extension_for_mime("video/quicktime"), Some("mov"));
        assert_eq!(extension_for_mime("video/x-msvideo"), None);
        assert_eq!(extension_for_mime("application/pdf"), None);
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("/m/videos/a.mp4"), "video/mp4");
        assert_eq!(content_type_for_extension("/m/videos/a.mov"), "video/quicktime");
        assert_eq!(
            content_type_for_extension("/m/videos/a.bin"),
            "application/octet-stream"
        );
    }
}
