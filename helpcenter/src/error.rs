use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error! status: {status}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cannot decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Neither plain JSON nor a multiplexed line carrying an `ok` field.
    #[error("{0}")]
    Parse(String),

    #[error("no bearer token stored, sign in first")]
    MissingToken,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("response has no data")]
    MissingData,

    #[error("asked for category {expected} but received {actual}")]
    UnexpectedCategory { expected: String, actual: String },

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("token storage: {0}")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
