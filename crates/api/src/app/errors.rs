use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use userhub_core::DomainError;
use userhub_infra::{StorageError, WriteError};

pub fn write_error_to_response(err: WriteError) -> axum::response::Response {
    match err {
        WriteError::InvalidArgument(e) => domain_error_to_response(e),
        WriteError::Storage(e) => storage_error_to_response(e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidArgument(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn storage_error_to_response(err: StorageError) -> axum::response::Response {
    match err {
        StorageError::ForeignKeyViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "unknown_user_type", msg)
        }
        StorageError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", msg)
        }
        other => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            other.to_string(),
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
