//! HTTP request handlers
//!
//! Implements the clip-serving REST endpoints: single clip, batch, cache
//! administration, and health/stats. Handlers validate input, consult the
//! cache via the render pool, and serialize results; CPU-bound rendering
//! never runs on the request-accepting runtime.

use crate::api::server::AppContext;
use crate::batch::{run_batch, BatchItem};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chirp_core::{ClipRequest, Error, ErrorKind, RenderSettings, RenderedClip};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

/// Window length assumed when `end_time` is omitted
const DEFAULT_CLIP_SECONDS: f64 = 3.0;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /clip: the clip window plus flattened render
/// settings, all optional except `file_path`. Unknown parameters are ignored.
#[derive(Debug, Deserialize)]
pub struct ClipQuery {
    file_path: Option<String>,
    start_time: Option<f64>,
    end_time: Option<f64>,

    window_size: Option<usize>,
    overlap_fraction: Option<f64>,
    colormap: Option<String>,
    db_min: Option<f64>,
    db_max: Option<f64>,
    use_bandpass: Option<bool>,
    bandpass_low: Option<f64>,
    bandpass_high: Option<f64>,
    show_reference_frequency: Option<bool>,
    reference_frequency: Option<f64>,
    resize_images: Option<bool>,
    image_width: Option<u32>,
    image_height: Option<u32>,
    normalize_audio: Option<bool>,
    channels: Option<u8>,
}

impl ClipQuery {
    /// Merge query overrides onto the default settings record
    fn settings(&self) -> RenderSettings {
        let defaults = RenderSettings::default();
        let default_resize = defaults.resize.unwrap_or((224, 224));
        let resize = if self.resize_images.unwrap_or(true) {
            Some((
                self.image_width.unwrap_or(default_resize.0),
                self.image_height.unwrap_or(default_resize.1),
            ))
        } else {
            None
        };
        RenderSettings {
            window_size: self.window_size.unwrap_or(defaults.window_size),
            overlap_fraction: self.overlap_fraction.unwrap_or(defaults.overlap_fraction),
            colormap: self.colormap.clone().unwrap_or(defaults.colormap),
            db_range: (
                self.db_min.unwrap_or(defaults.db_range.0),
                self.db_max.unwrap_or(defaults.db_range.1),
            ),
            use_bandpass: self.use_bandpass.unwrap_or(defaults.use_bandpass),
            bandpass_range: (
                self.bandpass_low.unwrap_or(defaults.bandpass_range.0),
                self.bandpass_high.unwrap_or(defaults.bandpass_range.1),
            ),
            show_reference_frequency: self
                .show_reference_frequency
                .unwrap_or(defaults.show_reference_frequency),
            reference_frequency: self
                .reference_frequency
                .unwrap_or(defaults.reference_frequency),
            resize,
            normalize_audio: self.normalize_audio.unwrap_or(defaults.normalize_audio),
            channels: self.channels.unwrap_or(defaults.channels),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClipResponse {
    status: String,
    audio_base64: String,
    spectrogram_base64: String,
    duration: f64,
    sample_rate: u32,
    frequency_range: (f64, f64),
    time_range: (f64, f64),
    file_path: String,
    start_time: f64,
    end_time: f64,
    cached: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    clips: Vec<BatchClip>,
    #[serde(default)]
    settings: RenderSettings,
    max_concurrency: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BatchClip {
    id: Option<String>,
    file_path: String,
    start_time: f64,
    end_time: f64,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    status: String,
    results: Vec<BatchResultEntry>,
    processing_time: f64,
    total_clips: usize,
    successful_clips: usize,
    failed_clips: usize,
}

/// One per-item batch outcome; success carries the payload, failure carries
/// the error and its kind
#[derive(Debug, Serialize)]
pub struct BatchResultEntry {
    id: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    clip: Option<ClipResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    cache_size: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    cache_size: usize,
    cache_max_entries: usize,
    worker_threads: usize,
    uptime_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
    error_kind: ErrorKind,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map pipeline errors onto HTTP statuses: validation → 400, missing file →
/// 404, everything else → 500
fn error_response(err: Error) -> ApiError {
    let status = match err.kind() {
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            error_kind: err.kind(),
        }),
    )
}

fn clip_response(request: &ClipRequest, clip: &RenderedClip, cached: bool) -> ClipResponse {
    ClipResponse {
        status: "success".to_string(),
        audio_base64: BASE64.encode(&clip.audio_payload),
        spectrogram_base64: BASE64.encode(&clip.image_payload),
        duration: clip.duration,
        sample_rate: clip.sample_rate,
        frequency_range: clip.frequency_range,
        time_range: clip.time_range,
        file_path: request.file_path.clone(),
        start_time: request.start_time,
        end_time: request.end_time,
        cached,
    }
}

// ============================================================================
// Clip Endpoints
// ============================================================================

/// GET /clip - Render (or fetch from cache) a single clip
pub async fn get_clip(
    State(ctx): State<AppContext>,
    Query(query): Query<ClipQuery>,
) -> Result<Json<ClipResponse>, ApiError> {
    let Some(file_path) = query.file_path.clone().filter(|p| !p.is_empty()) else {
        return Err(error_response(Error::Validation(
            "file_path parameter required".to_string(),
        )));
    };

    let start_time = query.start_time.unwrap_or(0.0);
    let end_time = query
        .end_time
        .unwrap_or(start_time + DEFAULT_CLIP_SECONDS);

    let request = ClipRequest {
        file_path,
        start_time,
        end_time,
        settings: query.settings(),
    };
    // Reject malformed requests before anything reaches the worker pool
    request.validate().map_err(error_response)?;

    match ctx.pool.render(request.clone()).await {
        Ok((clip, cached)) => {
            info!(
                "Served clip {} [{:.3}s - {:.3}s] cached={}",
                request.file_path, request.start_time, request.end_time, cached
            );
            Ok(Json(clip_response(&request, &clip, cached)))
        }
        Err(e) => {
            error!("Clip render failed for {}: {}", request.file_path, e);
            Err(error_response(e))
        }
    }
}

/// POST /clips/batch - Render many clips with shared settings
pub async fn post_clips_batch(
    State(ctx): State<AppContext>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    if req.clips.is_empty() {
        return Err(error_response(Error::Validation(
            "clips array required".to_string(),
        )));
    }
    req.settings.validate().map_err(error_response)?;

    let started = std::time::Instant::now();

    // Pre-validate every item; invalid windows become per-item error
    // outcomes without ever reaching the worker pool
    let mut prepared = Vec::with_capacity(req.clips.len());
    let mut items = Vec::new();
    for clip in &req.clips {
        let id = clip
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let request = ClipRequest {
            file_path: clip.file_path.clone(),
            start_time: clip.start_time,
            end_time: clip.end_time,
            settings: req.settings.clone(),
        };
        let rejected = request.validate().err();
        if rejected.is_none() {
            items.push(BatchItem {
                id: id.clone(),
                request: request.clone(),
            });
        }
        prepared.push((id, request, rejected));
    }

    let max_concurrency = req.max_concurrency.unwrap_or(ctx.batch_concurrency);
    let outcome = run_batch(&ctx.pool, items, max_concurrency).await;
    let mut rendered = outcome.results.into_iter();

    // Merge dispatched results back into input order
    let results: Vec<BatchResultEntry> = prepared
        .into_iter()
        .map(|(id, request, rejected)| {
            let outcome = match rejected {
                Some(e) => Err(e),
                None => match rendered.next() {
                    Some(item) => item.outcome,
                    None => Err(Error::Internal("batch result missing".to_string())),
                },
            };
            match outcome {
                Ok((clip, cached)) => BatchResultEntry {
                    id,
                    status: "success".to_string(),
                    clip: Some(clip_response(&request, &clip, cached)),
                    error: None,
                    error_kind: None,
                },
                Err(e) => BatchResultEntry {
                    id,
                    status: "error".to_string(),
                    clip: None,
                    error: Some(e.to_string()),
                    error_kind: Some(e.kind()),
                },
            }
        })
        .collect();

    let successful = results.iter().filter(|r| r.status == "success").count();
    let total = results.len();

    Ok(Json(BatchResponse {
        status: "success".to_string(),
        results,
        processing_time: started.elapsed().as_secs_f64(),
        total_clips: total,
        successful_clips: successful,
        failed_clips: total - successful,
    }))
}

// ============================================================================
// Cache Administration
// ============================================================================

/// DELETE /cache - Drop every cached clip
pub async fn clear_cache(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    let dropped = ctx.cache.len();
    ctx.cache.clear();
    info!("Cache cleared ({} entries dropped)", dropped);
    Json(StatusResponse {
        status: "cache_cleared".to_string(),
    })
}

// ============================================================================
// Health and Statistics
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "clip-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_size: ctx.cache.len(),
    })
}

/// GET /stats - Cache and pool statistics
pub async fn get_stats(State(ctx): State<AppContext>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache_size: ctx.cache.len(),
        cache_max_entries: ctx.cache.max_entries(),
        worker_threads: ctx.pool.worker_count(),
        uptime_seconds: ctx.started.elapsed().as_secs_f64(),
    })
}
