use reqwest::StatusCode;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("scheduler api error (timeout) [retryable]: {0}")]
    Timeout(#[source] reqwest::Error),
    #[error("scheduler api error (connect) [retryable]: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("scheduler api error (transport): {0}")]
    Transport(#[from] reqwest::Error),
    #[error("scheduler api error ({status}){}: {body}", retryable_tag(.status))]
    Status { status: StatusCode, body: String },
    #[error("invalid scheduler base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("scheduler api error (decode): {0}")]
    Decode(String),
    #[error("scheduler rejected the request: {}", .message.as_deref().unwrap_or("success=false"))]
    Rejected { message: Option<String> },
}

impl ApiError {
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err)
        } else if err.is_connect() {
            ApiError::Connect(err)
        } else {
            ApiError::Transport(err)
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Connect(_) => true,
            ApiError::Status { status, .. } => is_retryable_status(*status),
            ApiError::Transport(_)
            | ApiError::InvalidBaseUrl { .. }
            | ApiError::Decode(_)
            | ApiError::Rejected { .. } => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retryable_tag(status: &StatusCode) -> &'static str {
    if is_retryable_status(*status) {
        " [retryable]"
    } else {
        ""
    }
}
