use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lookback_utils::ErrorKind;

use crate::api_types::ErrorBody;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to port {0}. (Error: {1})")]
    PortBindingFailed(u16, std::io::Error),

    #[error("Server crashed. (Error: {0})")]
    ServerCrashed(std::io::Error),
}

/// Handler error, rendered as `{ "error": "..." }` with a status derived from
/// the error kind.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<lookback_utils::Error> for ApiError {
    fn from(err: lookback_utils::Error) -> Self {
        let (status, message) = match err.kind() {
            ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, err.to_string()),
            ErrorKind::RateLimited => (StatusCode::TOO_MANY_REQUESTS, err.to_string()),
            ErrorKind::UpstreamUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Block explorer unavailable, please try again later. ({err})"),
            ),
            ErrorKind::Aborted => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        ApiError { status, message }
    }
}

impl From<lookback_common::Error> for ApiError {
    fn from(err: lookback_common::Error) -> Self {
        lookback_utils::Error::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_kind() {
        let status = |err: lookback_utils::Error| ApiError::from(err).status;

        assert_eq!(
            status(lookback_utils::Error::MissingInput("date")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(lookback_utils::Error::RateLimited("Max rate limit reached".into())),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status(lookback_utils::Error::BlockNotFound(1)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(lookback_utils::Error::AbortDueToShutdown),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(lookback_common::Error::InvalidDate("soon".into())).status,
            StatusCode::BAD_REQUEST
        );
    }
}
