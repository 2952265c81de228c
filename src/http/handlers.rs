//! HTTP handlers for the submission guard.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::http::server::AppState;
use crate::integrity::{self, MatchKind, Record};
use crate::observability::metrics;

/// Errors a handler can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("similarity threshold {0} is outside 0.0..=1.0")]
    InvalidThreshold(f64),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            ApiError::InvalidThreshold(_) => (StatusCode::BAD_REQUEST, "INVALID_THRESHOLD"),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Seal a submission with integrity metadata.
pub async fn seal(Json(submission): Json<Record>) -> Json<Record> {
    let sealed = integrity::add_integrity_metadata(&submission);
    tracing::debug!(fields = submission.len(), "Submission sealed");
    Json(sealed)
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Check a sealed submission. Always 200; validity is in the body.
pub async fn verify(Json(submission): Json<Record>) -> Json<VerifyResponse> {
    let verdict = integrity::verify_submission_integrity(&submission);
    if let Some(error) = &verdict.error {
        metrics::record_integrity_failure(error.code());
    }
    Json(VerifyResponse {
        valid: verdict.valid,
        error: verdict.error.as_ref().map(ToString::to_string),
        code: verdict.error.as_ref().map(|e| e.code()),
    })
}

#[derive(Debug, Deserialize)]
pub struct DuplicateRequest {
    pub submission: Record,
    #[serde(default)]
    pub existing: Vec<Record>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateResponse {
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchKind>,
}

/// Look for an earlier submission the new one duplicates.
pub async fn duplicates(
    State(state): State<AppState>,
    Json(request): Json<DuplicateRequest>,
) -> Result<Json<DuplicateResponse>, ApiError> {
    let threshold = request
        .threshold
        .unwrap_or(state.config.duplicates.similarity_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ApiError::InvalidThreshold(threshold));
    }

    let found = integrity::detect_duplicate_submission(&request.submission, &request.existing, threshold);
    let response = match found {
        Some(found) => {
            metrics::record_duplicate(found.matched_by.as_str());
            tracing::info!(
                index = found.index,
                similarity = found.similarity,
                matched_by = found.matched_by.as_str(),
                "Duplicate submission detected"
            );
            DuplicateResponse {
                is_duplicate: true,
                index: Some(found.index),
                duplicate_of: found.record.get("id").cloned(),
                similarity: Some(found.similarity),
                matched_by: Some(found.matched_by),
            }
        }
        None => DuplicateResponse {
            is_duplicate: false,
            index: None,
            duplicate_of: None,
            similarity: None,
            matched_by: None,
        },
    };

    Ok(Json(response))
}
