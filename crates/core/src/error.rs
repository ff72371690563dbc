//! Client-side error model.
//!
//! Every backend call resolves to `ApiResult<T>`. The `Display` of an
//! [`ApiError`] is the message a screen shows to the user: backend messages
//! are carried verbatim, everything else gets a short generated message.

use thiserror::Error;

/// Result type returned by every request/response cycle.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of a single backend interaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Caller-supplied input was rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// No response was received (connection refused, DNS, TLS, ...).
    #[error("network error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status other than 401.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The backend answered `{ success: false, message }`.
    #[error("{0}")]
    Application(String),

    /// The backend answered 401. The session has already been evicted by the
    /// time a caller sees this.
    #[error("{message}")]
    Unauthorized { message: String },

    /// The response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn application(msg: impl Into<String>) -> Self {
        Self::Application(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build the error for a non-2xx response.
    ///
    /// `message` is the backend's envelope message, if the body carried one.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| status_message(status));

        if status == 401 {
            Self::Unauthorized { message }
        } else {
            Self::Status { status, message }
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// The user-visible message.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

fn status_message(status: u16) -> String {
    format!("HTTP error: status {status}")
}
