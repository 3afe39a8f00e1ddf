use crate::error::ApiError;
use crate::fetch;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use inference::{DetectionOutcome, ModelDescriptor};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models: usize,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/models", get(list_models))
        .route("/detect", post(detect))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelDescriptor>> {
    Json(state.dispatcher.models())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        models: state.dispatcher.registry().len(),
    })
}

async fn detect(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectionOutcome>, ApiError> {
    state.metrics.record_request();
    let start = Instant::now();

    match run_detection(&state, payload).await {
        Ok((model, outcome)) => {
            state.metrics.record_success(
                &model,
                outcome.detections.len(),
                start.elapsed().as_secs_f64(),
            );
            Ok(Json(outcome))
        }
        Err(err) => {
            state.metrics.record_failure(err.kind());
            Err(err)
        }
    }
}

async fn run_detection(
    state: &AppState,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<(String, DetectionOutcome), ApiError> {
    let (image_url, model) = validate(payload)?;

    // Reject unknown models before paying for the download.
    if !state.dispatcher.registry().contains(&model) {
        return Err(ApiError::InvalidModel);
    }

    let bytes = state.fetcher.fetch(&image_url).await?;
    tracing::debug!(model, bytes = bytes.len(), "Image downloaded");

    let dispatcher = state.dispatcher.clone();
    let model_name = model.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<DetectionOutcome, ApiError> {
        let image = fetch::decode(&bytes)?;
        Ok(dispatcher.detect(&model_name, &image)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("detection task failed: {e}")))??;

    tracing::info!(
        model,
        detections = outcome.detections.len(),
        width = outcome.original_width,
        height = outcome.original_height,
        "Detection served"
    );

    Ok((model, outcome))
}

/// Missing, null and empty fields are all treated the same way, as is a body
/// that is not valid JSON.
fn validate(payload: Result<Json<DetectRequest>, JsonRejection>) -> Result<(String, String), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable detect body");
        ApiError::MissingFields
    })?;

    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    match (non_empty(request.image_url), non_empty(request.model)) {
        (Some(image_url), Some(model)) => Ok((image_url, model)),
        _ => Err(ApiError::MissingFields),
    }
}
