//! API error type and its mapping to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kkscan_core::{EXTRACTION_FAILED_MESSAGE, EditorError, SessionError};
use kkscan_logging::redact_sensitive_data;
use kkscan_media::IntakeError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("session {0} not found")]
    UnknownSession(Uuid),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Intake(IntakeError::NotAnImage { .. }) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Intake(IntakeError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Intake(_) => StatusCode::BAD_REQUEST,
            ApiError::Session(e) => match e {
                SessionError::Busy | SessionError::StaleScan => StatusCode::CONFLICT,
                SessionError::NoResult => StatusCode::NOT_FOUND,
                SessionError::Editor(EditorError::MemberOutOfRange { .. }) => StatusCode::NOT_FOUND,
                SessionError::Editor(EditorError::NoMembers) => StatusCode::UNPROCESSABLE_ENTITY,
                SessionError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
                SessionError::Extraction(_) => StatusCode::BAD_GATEWAY,
            },
            ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client sees. Extraction failures all read the same.
    pub fn message(&self) -> String {
        match self {
            ApiError::Session(SessionError::Extraction(_)) => EXTRACTION_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = redact_sensitive_data(&self.to_string());
        if status.is_server_error() {
            error!(status = %status, error = %detail, "Request failed");
        } else {
            debug!(status = %status, error = %detail, "Request rejected");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
