//! The `{ success, data | message }` envelope every backend route replies with.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Raw response envelope.
///
/// `data` defaults to `null` so that routes which only answer `{ success }`
/// still decode into `()` or `Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,

    #[serde(default)]
    pub data: Value,

    #[serde(default)]
    pub message: Option<String>,

    /// Some error handlers add the raw exception text here.
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            message: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            message: Some(message.into()),
            error: None,
        }
    }

    /// Best message to show for a failed envelope.
    pub fn failure_message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .filter(|m| !m.trim().is_empty())
    }

    /// Unwrap a 2xx envelope into its typed payload.
    pub fn into_result<T: DeserializeOwned>(self) -> ApiResult<T> {
        if !self.success {
            let message = self
                .failure_message()
                .unwrap_or_else(|| "API request failed".to_string());
            return Err(ApiError::Application(message));
        }

        serde_json::from_value(self.data).map_err(|e| ApiError::decode(e.to_string()))
    }
}
