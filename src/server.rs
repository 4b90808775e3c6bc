//! HTTP adapter for the recorder entry points

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::errors::RecorderError;
use crate::models::{CommitRequest, ExtractionOutcome};
use crate::pipeline::Recorder;

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(recorder: Recorder) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/extract", post(extract))
        .route("/save", post(save))
        .route("/export", get(export))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(recorder)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Backend is running" }))
}

async fn extract(
    State(recorder): State<Recorder>,
    mut multipart: Multipart,
) -> Result<Json<ExtractionOutcome>, RecorderError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut motor_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                upload = Some((file_name, bytes.to_vec()));
            }
            Some("motorName") => {
                motor_name = Some(field.text().await.map_err(bad_multipart)?);
            }
            other => warn!("Ignoring multipart field {:?}", other),
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| RecorderError::InvalidInput("Missing field: file".to_string()))?;
    let motor_name = motor_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RecorderError::InvalidInput("Missing field: motorName".to_string()))?;

    let outcome = recorder.extract(bytes, &file_name, &motor_name).await?;
    Ok(Json(outcome))
}

async fn save(
    State(recorder): State<Recorder>,
    Json(request): Json<CommitRequest>,
) -> Result<Json<serde_json::Value>, RecorderError> {
    let reading = recorder.commit(request).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Data saved to DB",
        "id": reading.id,
        "imageUrl": reading.image_url,
    })))
}

async fn export(State(recorder): State<Recorder>) -> Result<Response, RecorderError> {
    let file = recorder.export().await?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> RecorderError {
    RecorderError::InvalidInput(format!("Malformed upload: {}", e))
}

impl RecorderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RecorderError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RecorderError::StagingNotFound(_) => StatusCode::NOT_FOUND,
            RecorderError::ExtractionError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RecorderError::OcrTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RecorderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        let body = Json(json!({ "status": "error", "message": self.to_string() }));
        (status, body).into_response()
    }
}
