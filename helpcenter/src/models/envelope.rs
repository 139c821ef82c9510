use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// `{ok, message, data}` wrapper returned by every backend endpoint.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Envelope<T> {
    pub ok: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwraps `data`, turning `ok=false` into [`ApiError::Rejected`].
    pub fn into_data(self) -> ApiResult<T> {
        if !self.ok {
            return Err(ApiError::Rejected(self.rejection_message()));
        }
        self.data.ok_or(ApiError::MissingData)
    }

    pub fn into_ok(self) -> ApiResult<()> {
        if self.ok {
            Ok(())
        } else {
            Err(ApiError::Rejected(self.rejection_message()))
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    fn rejection_message(&self) -> String {
        match self.message() {
            "" => "request was not accepted".to_string(),
            message => message.to_string(),
        }
    }
}

/// Response of the register / verify / resend-code operations.
pub type UserOpResponse = Envelope<serde_json::Value>;

impl UserOpResponse {
    pub fn token(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .get("token")?
            .as_str()
            .filter(|t| !t.is_empty())
    }
}
