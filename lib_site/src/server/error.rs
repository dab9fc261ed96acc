use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::connections::StoreError;
use crate::content::ContentError;
use crate::strategy::StrategyError;

/// # Application Error
///
/// Everything a handler can fail with. Each variant maps to one status code
/// and a JSON body of the form `{ "error_type", "message" }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("{0}")]
    MalformedPayload(String),

    #[error("Request body exceeds the configured limit")]
    PayloadTooLarge,

    #[error("A valid admin bearer token is required")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("The strategy helper is not configured")]
    StrategyDisabled,

    #[error("The site shell could not be read: {0}")]
    ShellMissing(String),
}

impl From<ContentError> for AppError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::UnknownCollection(name) => AppError::UnknownCollection(name),
            other => AppError::MalformedPayload(other.to_string()),
        }
    }
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            AppError::UnknownCollection(_) => (StatusCode::NOT_FOUND, "UnknownCollection"),
            AppError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "MalformedPayload"),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::Store(StoreError::Content(_)) => (StatusCode::BAD_REQUEST, "MalformedPayload"),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "StorageError"),
            AppError::Strategy(StrategyError::MissingField(_)) => {
                (StatusCode::BAD_REQUEST, "MalformedPayload")
            }
            AppError::Strategy(_) => (StatusCode::BAD_GATEWAY, "StrategyUpstreamError"),
            AppError::StrategyDisabled => (StatusCode::SERVICE_UNAVAILABLE, "StrategyDisabled"),
            AppError::ShellMissing(_) => (StatusCode::SERVICE_UNAVAILABLE, "ShellMissing"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        // Server-side faults are logged in full; client mistakes only briefly.
        if status.is_server_error() {
            error!(error_type, "{}", self);
        } else {
            warn!(error_type, "{}", self);
        }

        let message = match &self {
            // Storage details stay in the log.
            AppError::Store(StoreError::Content(e)) => e.to_string(),
            AppError::Store(_) => "The content store failed to process the request.".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error_type": error_type, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_statuses() {
        assert_eq!(
            AppError::UnknownCollection("widgets".into()).status_and_type().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::Unauthorized.status_and_type().0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Strategy(StrategyError::MissingField("goals")).status_and_type().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Strategy(StrategyError::Empty).status_and_type().0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Store(StoreError::QueryError("boom".into())).status_and_type().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn content_errors_become_client_errors() {
        let e: AppError = ContentError::NotAnObject("an array").into();
        assert_eq!(e.status_and_type().0, StatusCode::BAD_REQUEST);
        let e: AppError = ContentError::UnknownCollection("x".into()).into();
        assert!(matches!(e, AppError::UnknownCollection(_)));
    }
}
