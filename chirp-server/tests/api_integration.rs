//! Integration tests for the clip server API
//!
//! Drives the complete HTTP surface through the router without binding a
//! socket: health and stats, single-clip rendering with caching, batch
//! rendering with partial failure, and cache administration.

use axum::body::Body;
use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chirp_core::ClipCache;
use chirp_server::api::AppContext;
use chirp_server::{create_router, RenderPool};
use http::{Method, Request};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;

/// Build a router backed by a small cache and pool
fn setup_test_server(cache_size: usize) -> (axum::Router, Arc<ClipCache>) {
    let cache = Arc::new(ClipCache::new(cache_size));
    let pool = Arc::new(RenderPool::new(2, Arc::clone(&cache)));
    let ctx = AppContext {
        cache: Arc::clone(&cache),
        pool,
        batch_concurrency: 4,
        started: Instant::now(),
    };
    (create_router(ctx), cache)
}

/// Make one request against the router and parse the JSON body
async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(path);
    let request = if let Some(json_body) = body {
        request = request.header("content-type", "application/json");
        request.body(Body::from(json_body.to_string())).unwrap()
    } else {
        request.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Write a 22050 Hz mono sine-tone WAV fixture
fn write_tone_wav(dir: &Path, name: &str, seconds: f64) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    let count = (seconds * 22050.0) as usize;
    for i in 0..count {
        let t = i as f64 / 22050.0;
        let v = (2.0 * std::f64::consts::PI * 2000.0 * t).sin();
        writer
            .write_sample((v * i16::MAX as f64 * 0.4) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[tokio::test]
async fn health_reports_cache_size() {
    let (app, _cache) = setup_test_server(10);
    let (status, body) = make_request(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache_size"], 0);
}

#[tokio::test]
async fn stats_report_capacity_and_workers() {
    let (app, _cache) = setup_test_server(10);
    let (status, body) = make_request(&app, Method::GET, "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache_size"], 0);
    assert_eq!(body["cache_max_entries"], 10);
    assert_eq!(body["worker_threads"], 2);
}

#[tokio::test]
async fn clip_requires_file_path() {
    let (app, _cache) = setup_test_server(10);
    let (status, body) = make_request(&app, Method::GET, "/clip", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_kind"], "validation_error");
}

#[tokio::test]
async fn clip_rejects_non_positive_duration() {
    let (app, _cache) = setup_test_server(10);
    let (status, body) = make_request(
        &app,
        Method::GET,
        "/clip?file_path=/tmp/a.wav&start_time=5.0&end_time=2.0",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_kind"], "validation_error");
}

#[tokio::test]
async fn clip_missing_file_is_404() {
    let (app, _cache) = setup_test_server(10);
    let (status, body) = make_request(
        &app,
        Method::GET,
        "/clip?file_path=/nonexistent/audio.wav&start_time=0&end_time=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_kind"], "not_found");
}

#[tokio::test]
async fn clip_renders_and_caches() {
    let dir = tempfile::tempdir().unwrap();
    let wav = write_tone_wav(dir.path(), "tone.wav", 6.0);
    let (app, cache) = setup_test_server(10);

    let uri = format!(
        "/clip?file_path={}&start_time=2.0&end_time=5.0",
        wav.display()
    );
    let (status, body) = make_request(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["duration"], 3.0);
    assert_eq!(body["sample_rate"], 22050);
    assert_eq!(body["cached"], false);
    assert_eq!(cache.len(), 1);

    // Payloads decode: WAV sample count and PNG dimensions are exact
    let audio = BASE64
        .decode(body["audio_base64"].as_str().unwrap())
        .unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(audio)).unwrap();
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.len(), 3 * 22050);

    let png = BASE64
        .decode(body["spectrogram_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(&png[1..4], &b"PNG"[..]);

    // Same request again comes from cache, bit-identical
    let (status, second) = make_request(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert_eq!(second["audio_base64"], body["audio_base64"]);
    assert_eq!(second["spectrogram_base64"], body["spectrogram_base64"]);
}

#[tokio::test]
async fn differing_settings_do_not_share_cache_entries() {
    let dir = tempfile::tempdir().unwrap();
    let wav = write_tone_wav(dir.path(), "tone.wav", 3.0);
    let (app, cache) = setup_test_server(10);

    let base = format!("/clip?file_path={}&start_time=0&end_time=1", wav.display());
    let (status, _) = make_request(&app, Method::GET, &base, None).await;
    assert_eq!(status, StatusCode::OK);

    let other = format!("{base}&colormap=viridis");
    let (status, body) = make_request(&app, Method::GET, &other, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], false);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn batch_preserves_order_and_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let wav = write_tone_wav(dir.path(), "tone.wav", 4.0);
    let good = wav.display().to_string();
    let (app, _cache) = setup_test_server(10);

    let body = json!({
        "clips": [
            {"id": "one", "file_path": good, "start_time": 0.0, "end_time": 1.0},
            {"id": "two", "file_path": "/missing.wav", "start_time": 0.0, "end_time": 1.0},
            {"id": "three", "file_path": good, "start_time": 1.0, "end_time": 2.0}
        ]
    });
    let (status, body) = make_request(&app, Method::POST, "/clips/batch", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["total_clips"], 3);
    assert_eq!(body["successful_clips"], 2);
    assert_eq!(body["failed_clips"], 1);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["id"], "one");
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[1]["id"], "two");
    assert_eq!(results[1]["status"], "error");
    assert_eq!(results[1]["error_kind"], "not_found");
    assert_eq!(results[2]["id"], "three");
    assert_eq!(results[2]["status"], "success");
}

#[tokio::test]
async fn batch_without_ids_generates_them() {
    let dir = tempfile::tempdir().unwrap();
    let wav = write_tone_wav(dir.path(), "tone.wav", 2.0);
    let (app, _cache) = setup_test_server(10);

    let body = json!({
        "clips": [
            {"file_path": wav.display().to_string(), "start_time": 0.0, "end_time": 1.0}
        ],
        "settings": {"colormap": "magma", "channels": 1}
    });
    let (status, body) = make_request(&app, Method::POST, "/clips/batch", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    let results = body["results"].as_array().unwrap();
    assert!(!results[0]["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn batch_invalid_window_is_a_per_item_error() {
    let dir = tempfile::tempdir().unwrap();
    let wav = write_tone_wav(dir.path(), "tone.wav", 2.0);
    let good = wav.display().to_string();
    let (app, _cache) = setup_test_server(10);

    let body = json!({
        "clips": [
            {"id": "bad", "file_path": good, "start_time": 2.0, "end_time": 1.0},
            {"id": "ok", "file_path": good, "start_time": 0.0, "end_time": 1.0}
        ]
    });
    let (status, body) = make_request(&app, Method::POST, "/clips/batch", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["successful_clips"], 1);
    assert_eq!(body["failed_clips"], 1);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["id"], "bad");
    assert_eq!(results[0]["error_kind"], "validation_error");
    assert_eq!(results[1]["id"], "ok");
    assert_eq!(results[1]["status"], "success");
}

#[tokio::test]
async fn batch_rejects_empty_clip_list() {
    let (app, _cache) = setup_test_server(10);
    let body = json!({"clips": []});
    let (status, body) = make_request(&app, Method::POST, "/clips/batch", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_kind"], "validation_error");
}

#[tokio::test]
async fn delete_cache_clears_entries() {
    let dir = tempfile::tempdir().unwrap();
    let wav = write_tone_wav(dir.path(), "tone.wav", 2.0);
    let (app, cache) = setup_test_server(10);

    let uri = format!("/clip?file_path={}&start_time=0&end_time=1", wav.display());
    let (status, _) = make_request(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.len(), 1);

    let (status, body) = make_request(&app, Method::DELETE, "/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cache_cleared");
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn default_end_time_is_three_seconds_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let wav = write_tone_wav(dir.path(), "tone.wav", 5.0);
    let (app, _cache) = setup_test_server(10);

    let uri = format!("/clip?file_path={}&start_time=1.0", wav.display());
    let (status, body) = make_request(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["duration"], 3.0);
    assert_eq!(body["time_range"], json!([1.0, 4.0]));
}
