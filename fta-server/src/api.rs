//! REST API routes

use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use fta_core::{AnalysisError, LapAnalysis, LapSource, PredictionResult, TireCompound};
use fta_sources::{ingest, UploadRequest};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;

type ApiError = (StatusCode, String);

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        // Telemetry endpoints
        .route("/api/telemetry/upload", post(upload_telemetry)
            .layer(DefaultBodyLimit::max(upload_limit)))
        .route("/api/telemetry/upload-file", post(upload_file)
            .layer(DefaultBodyLimit::max(upload_limit)))
        .route("/api/telemetry/lap/:lap", get(get_lap))
        .route("/api/laps", get(list_laps))
        .route("/api/laps/:lap", delete(delete_lap))
        // Analysis endpoints
        .route("/api/analysis/:lap", get(analyze_lap))
        .route("/api/predict", get(predict_lap_time))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Map the analysis taxonomy onto response classes
fn analysis_error(err: AnalysisError) -> ApiError {
    let status = if err.is_bad_request() {
        StatusCode::BAD_REQUEST
    } else if matches!(err, AnalysisError::LapNotFound { .. }) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, err.to_string())
}

// === Service Endpoints ===

async fn service_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "F1 Telemetry Analyzer API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
        "prediction_source": state.analyzer.predictor().source(),
        "endpoints": {
            "upload": "/api/telemetry/upload",
            "upload_file": "/api/telemetry/upload-file",
            "lap": "/api/telemetry/lap/{lap_number}",
            "laps": "/api/laps",
            "analysis": "/api/analysis/{lap_number}",
            "predict": "/api/predict",
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let laps = state.store.read().await.lap_count();
    Json(json!({
        "status": "healthy",
        "prediction_source": state.analyzer.predictor().source(),
        "laps": laps,
    }))
}

// === Telemetry Endpoints ===

async fn upload_telemetry(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    store_samples(&state, request.data_points).await
}

/// Accept a `.json` or `.ndjson` telemetry export
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read upload: {}", e)))?
        .ok_or((StatusCode::BAD_REQUEST, "No file provided".to_string()))?;

    let file_name = field.file_name().unwrap_or("upload.json").to_string();
    let lower = file_name.to_lowercase();
    if !lower.ends_with(".json") && !lower.ends_with(".ndjson") {
        return Err((
            StatusCode::BAD_REQUEST,
            "Only .json and .ndjson files are supported".to_string(),
        ));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file data: {}", e)))?;

    info!("Received telemetry file: {} ({} bytes)", file_name, data.len());

    let text = std::str::from_utf8(&data)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("File is not UTF-8: {}", e)))?;
    let samples = ingest::parse_samples(text)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to parse {}: {:#}", file_name, e)))?;

    store_samples(&state, samples).await
}

async fn store_samples(
    state: &AppState,
    samples: Vec<fta_core::TelemetrySample>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if samples.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Upload must contain at least one data point".to_string(),
        ));
    }

    let summary = state
        .store
        .write()
        .await
        .insert_batch(samples)
        .map_err(analysis_error)?;

    info!(
        "Stored {} data points for laps {:?}",
        summary.data_points_stored, summary.lap_numbers
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "lap_numbers": summary.lap_numbers,
            "data_points_stored": summary.data_points_stored,
        })),
    ))
}

async fn get_lap(
    State(state): State<AppState>,
    Path(lap): Path<u32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let samples = state
        .store
        .read()
        .await
        .lap_samples(lap)
        .map_err(analysis_error)?;

    Ok(Json(json!({
        "lap_number": lap,
        "total_points": samples.len(),
        "data_points": samples,
    })))
}

async fn list_laps(State(state): State<AppState>) -> Json<serde_json::Value> {
    let laps = state.store.read().await.summaries();
    Json(json!({
        "total": laps.len(),
        "laps": laps,
    }))
}

async fn delete_lap(State(state): State<AppState>, Path(lap): Path<u32>) -> impl IntoResponse {
    let mut store = state.store.write().await;

    if store.remove(lap).is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// === Analysis Endpoints ===

#[derive(Deserialize)]
struct AnalysisQuery {
    actual_lap_time: Option<f64>,
}

async fn analyze_lap(
    State(state): State<AppState>,
    Path(lap): Path<u32>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<LapAnalysis>, ApiError> {
    // Snapshot under the read lock; analysis runs without holding it
    let (samples, reference) = {
        let store = state.store.read().await;
        let samples = store.lap_samples(lap).map_err(analysis_error)?;
        (samples, store.reference_for(&state.analyzer, lap))
    };

    let analysis = state
        .analyzer
        .analyze_with_reference(lap, &samples, query.actual_lap_time, Some(&reference))
        .map_err(analysis_error)?;

    info!(
        "Lap {} analyzed: delta {:+.3}s, score {:.1}, {} mistakes",
        lap,
        analysis.delta,
        analysis.performance_score,
        analysis.mistakes_detected.len()
    );

    Ok(Json(analysis))
}

#[derive(Deserialize)]
struct PredictQuery {
    tire_compound: String,
    tire_wear: f64,
    track_temp: f64,
    avg_speed: Option<f64>,
}

async fn predict_lap_time(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<PredictionResult>, ApiError> {
    let compound: TireCompound = query.tire_compound.parse().map_err(analysis_error)?;

    state
        .analyzer
        .predictor()
        .predict(compound, query.tire_wear, query.track_temp, query.avg_speed)
        .map(Json)
        .map_err(analysis_error)
}
