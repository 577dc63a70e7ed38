use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Persistence-layer failures. `NotFound` names the entity so the API layer
/// can surface it without re-querying.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("{0} not found")]
    NotFound(&'static str),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("upstream service error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => ApiError::NotFound(entity),
            other => ApiError::Store(other),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            ApiError::NotFound(entity) => {
                (StatusCode::NOT_FOUND, format!("{entity} not found"), None)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            ApiError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                "upstream service error".to_string(),
                Some(msg.clone()),
            ),
            ApiError::Store(err) => {
                error!("database failure: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database error".to_string(),
                    Some(err.to_string()),
                )
            }
        };
        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_becomes_api_not_found() {
        let api: ApiError = StoreError::NotFound("meeting").into();
        assert!(matches!(api, ApiError::NotFound("meeting")));
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::NotFound("decision").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn upstream_maps_to_502() {
        let response = ApiError::Upstream("model server down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
