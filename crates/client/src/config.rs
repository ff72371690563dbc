//! Client configuration (backend base URL, token location).

use std::path::PathBuf;

use reqwest::Url;
use thiserror::Error;

use hospital_rbac_core::{ApiError, ApiResult};

/// Selects the backend base URL.
pub const API_URL_ENV: &str = "HOSPITAL_API_URL";

/// Overrides where the auth token is persisted.
pub const TOKEN_PATH_ENV: &str = "HOSPITAL_TOKEN_PATH";

/// Local development backend.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Storage key (file name) of the persisted auth token.
pub const TOKEN_KEY: &str = "auth_token";

const APP_DIR: &str = "hospital-rbac";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid backend base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to resolve a data directory for the auth token; set HOSPITAL_TOKEN_PATH")]
    NoDataDir,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    token_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Validate `base_url` and build a config that stores the token in the
    /// default location.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        let url = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid("URL has no host".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("URL must not carry a query or fragment".to_string()));
        }

        Ok(Self {
            base_url: url,
            token_path: None,
        })
    }

    /// Read `HOSPITAL_API_URL` (default [`DEFAULT_API_URL`]) and
    /// `HOSPITAL_TOKEN_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&url)?;

        if let Ok(path) = std::env::var(TOKEN_PATH_ENV) {
            if !path.trim().is_empty() {
                config.token_path = Some(PathBuf::from(path));
            }
        }

        Ok(config)
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a backend-relative `path` (which must start with `/`).
    pub fn endpoint(&self, path: &str) -> ApiResult<Url> {
        if !path.starts_with('/') {
            return Err(ApiError::validation(format!(
                "path '{path}' must be backend-relative and start with '/'"
            )));
        }

        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| ApiError::validation(format!("invalid path '{path}': {e}")))
    }

    /// Where the auth token lives.
    pub fn token_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.token_path {
            return Ok(path.clone());
        }

        let base = dirs::data_local_dir()
            .or_else(|| {
                dirs::home_dir().map(|mut h| {
                    h.push(".local");
                    h.push("share");
                    h
                })
            })
            .ok_or(ConfigError::NoDataDir)?;

        Ok(base.join(APP_DIR).join(TOKEN_KEY))
    }
}
