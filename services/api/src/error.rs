//! Custom error types for the Dogtrack API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::builder::BuildError;
use crate::timeclock::TimeError;
use crate::walks::WalkError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Event construction failed validation or resolution
    #[error(transparent)]
    Validation(#[from] BuildError),

    /// Walk tracker rejection or failure
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl From<TimeError> for ApiError {
    fn from(err: TimeError) -> Self {
        ApiError::Validation(BuildError::Time(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Validation(err) => {
                let body = json!({
                    "error": err.to_string(),
                    "field": err.field(),
                });
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            ApiError::Walk(WalkError::AlreadyActive) => {
                // An expected outcome, reported as state rather than failure.
                let body = json!({
                    "error": "a walk is already in progress",
                    "active": true,
                });
                (StatusCode::CONFLICT, Json(body)).into_response()
            }
            ApiError::Walk(WalkError::NotAWalk(id)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("event {} is not a walk", id) })),
            )
                .into_response(),
            ApiError::Walk(WalkError::Store(_)) | ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Database error" })),
            )
                .into_response(),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response(),
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
