use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reticle_core::Stage;
use reticle_model::ModelError;
use thiserror::Error;

/// Body of every server-side failure; the detail is only logged.
pub const SUBMISSION_FAILED: &str = "Error creating Kubernetes Job";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("provisioning failed at {stage}: {message}")]
    Provisioning { stage: Stage, message: String },

    #[error("submission not finished after {0:?}")]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Deserialization(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Provisioning { .. } | ApiError::Timeout(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Caller faults are echoed back, server faults are not.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Decode(msg) => ApiError::Deserialization(msg),
            ModelError::Validation(errors) => ApiError::Validation(errors),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = if self.is_client_error() {
            self.to_string()
        } else {
            SUBMISSION_FAILED.to_string()
        };
        (self.status(), body).into_response()
    }
}
