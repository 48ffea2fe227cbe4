use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use breedlens_core::is_supported_upload;
use breedlens_pipeline::{PipelineState, EXPORT_FILE_NAME};
use serde::Deserialize;

// ============================================================================
// Health and configuration endpoints
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.config.sanitized(state.credential_present))
}

// ============================================================================
// Classification endpoint
// ============================================================================

pub async fn classify(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    // Pull the `image` part out of the upload.
    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("image") => {
                let file_name = field.file_name().unwrap_or("upload.jpg").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((file_name, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("failed to read upload: {e}"),
                        )
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("malformed multipart request: {e}"),
                )
            }
        }
    }

    let Some((file_name, bytes)) = upload else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing multipart field \"image\"".to_string(),
        );
    };

    if !is_supported_upload(&file_name) {
        return error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("unsupported file {file_name:?}, expected jpg, jpeg, or png"),
        );
    }

    metrics::counter!("breedlens_uploads_total").increment(1);
    tracing::info!(file = %file_name, size = bytes.len(), "processing upload");

    let run = state.pipeline.process(bytes).await;

    let outcome = run.state().to_string();
    metrics::counter!("breedlens_outcomes_total", "outcome" => outcome).increment(1);
    metrics::histogram!("breedlens_pipeline_latency_ms").record(run.latency_ms as f64);

    let record = state.record_run(&file_name, run);
    let status = match record.state {
        PipelineState::Failed => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::OK,
    };

    (status, Json(serde_json::to_value(&record).unwrap_or_default())).into_response()
}

// ============================================================================
// Record inspection and export endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub limit: Option<usize>,
}

pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(20);
    Json(state.recent_records(limit))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.get_record(&id) {
        Some(record) => Json(record).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no record {id}")),
    }
}

pub async fn export_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(record) = state.get_record(&id) else {
        return error_response(StatusCode::NOT_FOUND, format!("no record {id}"));
    };

    match record.report.to_csv() {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("export failed: {e}"),
        ),
    }
}

fn error_response(status: StatusCode, message: String) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
