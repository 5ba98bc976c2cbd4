//! API integration tests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;
use tower::ServiceExt;

use vguard_api::auth::Claims;
use vguard_api::{create_router, ApiConfig, AppState};
use vguard_models::{TenantId, VideoId, VideoRecord};

const TEST_SECRET: &str = "test-secret";

async fn test_app() -> (TempDir, AppState, Router) {
    let dir = TempDir::new().unwrap();
    let config = ApiConfig {
        media_root: dir.path().join("media"),
        data_dir: dir.path().join("data"),
        jwt_secret: TEST_SECRET.to_string(),
        ..ApiConfig::default()
    };
    let state = AppState::new(config).await.unwrap();
    let app = create_router(state.clone());
    (dir, state, app)
}

fn token(tenant: &str, user: &str, role: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user.to_string(),
        tenant_id: tenant.to_string(),
        role: role.to_string(),
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Seed a stored video of `size` bytes for a tenant.
async fn seed_video(state: &AppState, tenant: &str, uploader: &str, size: usize) -> VideoRecord {
    let id = VideoId::new();
    let path = state.media_store.video_path(&id, "mp4");
    tokio::fs::write(&path, vec![0u8; size]).await.unwrap();

    let record = VideoRecord::new(
        id,
        TenantId::from_string(tenant),
        uploader,
        "Seeded clip",
        "",
        path.to_string_lossy(),
        size as u64,
    );
    state
        .repo(TenantId::from_string(tenant))
        .create(&record)
        .await
        .unwrap();
    record
}

fn multipart_upload(bearer: &str, title: &str, file_bytes: &[u8]) -> Request<Body> {
    let boundary = "vguard-upload-test";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"clip.mp4\"\r\nContent-Type: video/mp4\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(axum::http::Method::POST)
        .uri("/api/videos/upload")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, _state, app) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (_dir, _state, app) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/videos")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_stores_file_and_creates_record() {
    let (_dir, state, app) = test_app().await;
    let auth = token("acme", "user-1", "member");

    let response = app
        .oneshot(multipart_upload(&auth, "Launch recap", b"fake mp4 bytes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let video_id = body["video"]["video_id"].as_str().unwrap();
    assert_eq!(body["video"]["title"], "Launch recap");

    let stored = state
        .media_store
        .video_path(&VideoId::from(video_id), "mp4");
    assert_eq!(std::fs::read(&stored).unwrap(), b"fake mp4 bytes");
}

#[tokio::test]
async fn test_failed_record_create_leaves_no_stored_file() {
    let (_dir, state, app) = test_app().await;
    let auth = token("acme", "user-1", "member");

    // Turn the metadata directory into a file so the record write fails
    // after the upload has already been ingested into the store.
    tokio::fs::remove_dir_all(&state.config.data_dir).await.unwrap();
    tokio::fs::write(&state.config.data_dir, b"").await.unwrap();

    let response = app
        .oneshot(multipart_upload(&auth, "Doomed clip", b"fake mp4 bytes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let videos_dir = state.config.media_root.join("videos");
    let stored: Vec<_> = std::fs::read_dir(&videos_dir).unwrap().collect();
    assert!(stored.is_empty(), "ingested file must be removed: {stored:?}");

    let uploads_dir = state.config.media_root.join("uploads");
    if uploads_dir.exists() {
        let parts: Vec<_> = std::fs::read_dir(&uploads_dir).unwrap().collect();
        assert!(parts.is_empty(), "no partial upload may remain: {parts:?}");
    }
}

#[tokio::test]
async fn test_stream_full_file() {
    let (_dir, state, app) = test_app().await;
    let record = seed_video(&state, "acme", "user-1", 1_000_000).await;
    let auth = token("acme", "user-1", "member");

    let response = app
        .oneshot(get(
            &format!("/api/videos/{}/stream", record.video_id),
            &auth,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCEPT_RANGES].to_str().unwrap(),
        "bytes"
    );
    assert_eq!(body_bytes(response).await.len(), 1_000_000);
}

#[tokio::test]
async fn test_stream_bounded_range() {
    let (_dir, state, app) = test_app().await;
    let record = seed_video(&state, "acme", "user-1", 1_000_000).await;
    let auth = token("acme", "user-1", "member");

    let mut request = get(&format!("/api/videos/{}/stream", record.video_id), &auth);
    request
        .headers_mut()
        .insert(header::RANGE, "bytes=500000-599999".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE].to_str().unwrap(),
        "bytes 500000-599999/1000000"
    );
    assert_eq!(body_bytes(response).await.len(), 100_000);
}

#[tokio::test]
async fn test_stream_open_ended_range_runs_to_eof() {
    let (_dir, state, app) = test_app().await;
    let record = seed_video(&state, "acme", "user-1", 1_000_000).await;
    let auth = token("acme", "user-1", "member");

    let mut request = get(&format!("/api/videos/{}/stream", record.video_id), &auth);
    request
        .headers_mut()
        .insert(header::RANGE, "bytes=999900-".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE].to_str().unwrap(),
        "bytes 999900-999999/1000000"
    );
    assert_eq!(body_bytes(response).await.len(), 100);
}

#[tokio::test]
async fn test_stream_out_of_bounds_range() {
    let (_dir, state, app) = test_app().await;
    let record = seed_video(&state, "acme", "user-1", 1_000_000).await;
    let auth = token("acme", "user-1", "member");

    let mut request = get(&format!("/api/videos/{}/stream", record.video_id), &auth);
    request
        .headers_mut()
        .insert(header::RANGE, "bytes=1000000-".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE].to_str().unwrap(),
        "bytes */1000000"
    );
}

#[tokio::test]
async fn test_cross_tenant_access_is_forbidden() {
    let (_dir, state, app) = test_app().await;
    let record = seed_video(&state, "acme", "user-1", 1024).await;
    let other = token("globex", "user-9", "member");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/videos/{}", record.video_id), &other))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // And an unknown ID stays a plain 404.
    let auth = token("acme", "user-1", "member");
    let response = app
        .oneshot(get(&format!("/api/videos/{}", VideoId::new()), &auth))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_is_scoped_to_token_tenant() {
    let (_dir, state, app) = test_app().await;
    seed_video(&state, "acme", "user-1", 1024).await;
    seed_video(&state, "acme", "user-1", 1024).await;
    seed_video(&state, "globex", "user-9", 1024).await;

    let auth = token("acme", "user-1", "member");
    let response = app.oneshot(get("/api/videos", &auth)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_delete_requires_owner_or_admin() {
    let (_dir, state, app) = test_app().await;
    let record = seed_video(&state, "acme", "user-1", 1024).await;

    // Another member of the same tenant cannot delete.
    let member = token("acme", "user-2", "member");
    let mut request = get(&format!("/api/videos/{}", record.video_id), &member);
    *request.method_mut() = axum::http::Method::DELETE;
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A tenant admin can.
    let admin = token("acme", "admin-1", "admin");
    let mut request = get(&format!("/api/videos/{}", record.video_id), &admin);
    *request.method_mut() = axum::http::Method::DELETE;
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(!std::path::Path::new(&record.file_path).exists());
}

#[tokio::test]
async fn test_view_counter_and_title_update() {
    let (_dir, state, app) = test_app().await;
    let record = seed_video(&state, "acme", "user-1", 1024).await;
    let auth = token("acme", "user-1", "member");

    let mut request = get(&format!("/api/videos/{}/view", record.video_id), &auth);
    *request.method_mut() = axum::http::Method::PATCH;
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["views"], 1);

    let request = Request::builder()
        .method(axum::http::Method::PATCH)
        .uri(format!("/api/videos/{}/title", record.video_id))
        .header(header::AUTHORIZATION, format!("Bearer {auth}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"title":"Renamed"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["title"], "Renamed");
}

#[tokio::test]
async fn test_empty_title_is_rejected() {
    let (_dir, state, app) = test_app().await;
    let record = seed_video(&state, "acme", "user-1", 1024).await;
    let auth = token("acme", "user-1", "member");

    let request = Request::builder()
        .method(axum::http::Method::PATCH)
        .uri(format!("/api/videos/{}/title", record.video_id))
        .header(header::AUTHORIZATION, format!("Bearer {auth}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"title":""}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
