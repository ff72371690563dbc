//! The single choke point for backend calls.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use hospital_rbac_core::{ApiError, ApiResult, Envelope};

use crate::config::{ClientConfig, ConfigError};
use crate::session::SessionHandle;

/// Header carrying a per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// What a 401 response does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnUnauthorized {
    /// Clear the token and session, send the navigator to login.
    #[default]
    Evict,

    /// Report the backend message as [`ApiError::Application`] and keep the
    /// session. For endpoints whose 401 means rejected input rather than a
    /// dead token (`/auth/change-password`).
    Keep,
}

/// HTTP wrapper around the backend REST API.
///
/// - Attaches `Authorization: Bearer <token>` when the session holds one
/// - Unwraps the `{ success, data | message }` envelope
/// - Evicts the session on any 401
/// - Never panics for a completed request; every failure is an [`ApiError`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(config: Arc<ClientConfig>, session: SessionHandle) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue one request. `body`, when present, is sent as JSON.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> ApiResult<T> {
        self.request_with(method, path, body, extra_headers, OnUnauthorized::Evict)
            .await
    }

    /// [`request`](Self::request) with an explicit 401 policy.
    pub async fn request_with<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
        on_unauthorized: OnUnauthorized,
    ) -> ApiResult<T> {
        let url = self.config.endpoint(path)?;
        self.send(method, url, body, extra_headers, on_unauthorized)
            .await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::GET, path, None, None).await
    }

    /// GET with URL-encoded query parameters appended to `path`.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let mut url = self.config.endpoint(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        self.send(Method::GET, url, None, None, OnUnauthorized::Evict)
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = to_json(body)?;
        self.request(Method::POST, path, Some(body), None).await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::POST, path, None, None).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = to_json(body)?;
        self.request(Method::PUT, path, Some(body), None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::DELETE, path, None, None).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
        on_unauthorized: OnUnauthorized,
    ) -> ApiResult<T> {
        let request_id = Uuid::now_v7();
        let path = url.path().to_string();

        let mut req = self
            .http
            .request(method.clone(), url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if let Some(headers) = extra_headers {
            req = req.headers(headers);
        }
        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = &body {
            req = req.json(body);
        }

        tracing::debug!(%method, %path, %request_id, "api request");

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(%method, %path, %request_id, error = %e, "api transport failure");
            ApiError::transport(e.to_string())
        })?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Envelope>(&bytes)
                .ok()
                .and_then(|env| env.failure_message());
            tracing::debug!(%method, %path, %request_id, status = status.as_u16(), "api error status");

            if status != StatusCode::UNAUTHORIZED {
                return Err(ApiError::from_status(status.as_u16(), message));
            }

            return Err(match on_unauthorized {
                OnUnauthorized::Evict => {
                    self.session.evict();
                    ApiError::from_status(status.as_u16(), message)
                }
                OnUnauthorized::Keep => match message {
                    Some(message) => ApiError::application(message),
                    None => ApiError::from_status(status.as_u16(), None),
                },
            });
        }

        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::decode(e.to_string()))?;

        envelope.into_result()
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::validation(format!("unserializable body: {e}")))
}
