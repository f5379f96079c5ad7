use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// Every failure the service reports is one of these five kinds. Lower-level
/// failures (I/O, HTTP client, JSON) are translated at the boundary where they
/// happen rather than converted implicitly.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only upstream failures are worth a second attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::UpstreamUnavailable(_))
    }

    /// Rebuilds an error from an HTTP status and the server's message
    ///
    /// Used by the client transport to map responses back into the taxonomy.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::InvalidInput(message)
            }
            StatusCode::CONFLICT => AppError::Conflict(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::INTERNAL_SERVER_ERROR => AppError::Persistence(message),
            _ => AppError::UpstreamUnavailable(message),
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::InvalidInput(msg)
            | AppError::Conflict(msg)
            | AppError::NotFound(msg)
            | AppError::UpstreamUnavailable(msg)
            | AppError::Persistence(msg) => msg,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        }

        let body = Json(json!({
            "error": self.message()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::UpstreamUnavailable("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Persistence("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_status_inverts_status() {
        let errors = vec![
            AppError::InvalidInput("bad page".into()),
            AppError::Conflict("dup".into()),
            AppError::NotFound("gone".into()),
            AppError::UpstreamUnavailable("omdb down".into()),
            AppError::Persistence("disk full".into()),
        ];

        for error in errors {
            let rebuilt = AppError::from_status(error.status(), error.message().to_string());
            assert_eq!(rebuilt, error);
        }
    }

    #[test]
    fn test_unknown_status_is_upstream() {
        let error = AppError::from_status(StatusCode::SERVICE_UNAVAILABLE, "busy".into());
        assert!(error.is_retryable());
    }

    #[test]
    fn test_only_upstream_is_retryable() {
        assert!(AppError::UpstreamUnavailable("x".into()).is_retryable());
        assert!(!AppError::InvalidInput("x".into()).is_retryable());
        assert!(!AppError::Persistence("x".into()).is_retryable());
        assert!(!AppError::Conflict("x".into()).is_retryable());
    }
}
