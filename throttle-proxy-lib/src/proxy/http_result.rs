use http::StatusCode;
use thiserror::Error;

/// Describes things that can go wrong while forwarding a single request.
/// Each variant maps to the status of the synthetic error response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Failed to generate upstream request: {0}")]
    FailedToGenerateUpstreamRequest(String),

    #[error("Failed to get response from upstream: {0}")]
    FailedToGetResponseFromBackend(String),

    #[error("Response hook failed: {0}")]
    ResponseHookFailed(String),
}

impl HttpError {
    /// Short, stable label used for metrics and log fields
    pub fn error_type(&self) -> &'static str {
        match self {
            HttpError::InvalidUri(_) => "invalid_uri",
            HttpError::FailedToGenerateUpstreamRequest(_) => "upstream_request",
            HttpError::FailedToGetResponseFromBackend(_) => "upstream_transport",
            HttpError::ResponseHookFailed(_) => "response_hook",
        }
    }
}

impl From<HttpError> for StatusCode {
    fn from(e: HttpError) -> StatusCode {
        StatusCode::from(&e)
    }
}

impl From<&HttpError> for StatusCode {
    fn from(e: &HttpError) -> StatusCode {
        match e {
            HttpError::InvalidUri(_) => StatusCode::BAD_REQUEST,
            HttpError::FailedToGenerateUpstreamRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::FailedToGetResponseFromBackend(_) => StatusCode::BAD_GATEWAY,
            HttpError::ResponseHookFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
