use axum::http::StatusCode;
use thiserror::Error;

/// Request-level failures. Anything local to one member or one document never
/// becomes an ApiError; those are captured per-result or logged.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),
  #[error("{0}")]
  Configuration(String),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Upstream(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
  }
}
