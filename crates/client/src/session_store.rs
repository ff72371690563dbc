//! Login, logout, bootstrap and password change.
//!
//! ```text
//! Bootstrapping ──(token + /auth/me ok)──▶ Authenticated
//!       │                                   │  ▲
//!       └─(no token / me failed)─▶ Unauthenticated ─(login ok)─┘
//!                                   ▲       │
//!                 (logout / any 401)└───────┘
//! ```

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use hospital_rbac_auth::UserIdentity;
use hospital_rbac_core::{ApiError, ApiResult};

use crate::http::{ApiClient, OnUnauthorized};
use crate::navigation::Navigator;
use crate::session::{Session, SessionHandle, SessionPhase};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
    user: UserIdentity,
}

#[derive(Debug, Serialize)]
struct ChangePasswordRequest<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

/// Operations that move the session between phases.
#[derive(Debug, Clone)]
pub struct SessionStore {
    api: ApiClient,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn handle(&self) -> &SessionHandle {
        self.api.session()
    }

    fn navigator(&self) -> &Navigator {
        self.handle().navigator()
    }

    pub fn snapshot(&self) -> Session {
        self.handle().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.handle().subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        self.snapshot().phase()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    /// True only while [`bootstrap`](Self::bootstrap) runs.
    pub fn loading(&self) -> bool {
        self.snapshot().loading
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.snapshot().user
    }

    /// Resolve the persisted token (if any) into a session.
    ///
    /// Any failure discards the token and ends unauthenticated.
    pub async fn bootstrap(&self) -> SessionPhase {
        let handle = self.handle();
        handle.begin_bootstrap();

        let saved = match handle.tokens().load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted token");
                None
            }
        };

        let Some(token) = saved else {
            tracing::debug!("no persisted token; starting signed out");
            handle.clear();
            self.navigator().land(&handle.snapshot());
            return SessionPhase::Unauthenticated;
        };

        handle.adopt_token(token);

        match self.api.get::<UserIdentity>("/auth/me").await {
            Ok(user) => {
                tracing::info!(username = %user.username, role = %user.role_name, "session restored");
                handle.finish_bootstrap(user);
            }
            Err(e) => {
                tracing::warn!(error = %e, "persisted token rejected; discarding it");
                handle.clear();
            }
        }

        let session = handle.snapshot();
        self.navigator().land(&session);
        session.phase()
    }

    /// Exchange credentials for a token.
    ///
    /// On success the token is persisted, the identity stored and the
    /// navigator moved to the dashboard. Failures leave the session as it was.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<UserIdentity> {
        let body = LoginRequest { username, password };

        match self.api.post::<LoginData, _>("/auth/login", &body).await {
            Ok(LoginData { token, user }) => {
                self.handle().establish(token, user.clone());
                self.navigator().land(&self.snapshot());
                Ok(user)
            }
            Err(e) => {
                tracing::info!(%username, error = %e, "login failed");
                Err(e)
            }
        }
    }

    /// Sign out. The backend is told on a best-effort basis; local state is
    /// always cleared.
    pub async fn logout(&self) {
        if self.handle().token().is_some() {
            if let Err(e) = self.api.post_empty::<Value>("/auth/logout").await {
                tracing::warn!(error = %e, "logout notification failed; clearing locally");
            }
        }

        self.handle().clear();
        self.navigator().redirect_to_login();
        tracing::info!("signed out");
    }

    /// Pass-through to `/auth/change-password`. Leaves the session untouched.
    ///
    /// The backend answers a wrong current password with 401, so a 401 here
    /// is reported as an application error instead of evicting the session.
    pub async fn change_password(&self, current: &str, new: &str) -> ApiResult<()> {
        let body = ChangePasswordRequest {
            current_password: current,
            new_password: new,
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| ApiError::validation(format!("unserializable body: {e}")))?;

        self.api
            .request_with::<Value>(
                Method::POST,
                "/auth/change-password",
                Some(body),
                None,
                OnUnauthorized::Keep,
            )
            .await
            .map(|_| ())
    }

    /// Re-read `/auth/me` and replace the stored identity.
    ///
    /// The identity is only replaced when the session still holds the token
    /// the request was sent with; a sign-out or a different sign-in while the
    /// request was in flight wins.
    pub async fn refresh_user(&self) -> ApiResult<UserIdentity> {
        let sent_with = self.handle().token();
        let user: UserIdentity = self.api.get("/auth/me").await?;

        let session = self.snapshot();
        if session.is_authenticated() && sent_with.is_some() && session.token == sent_with {
            self.handle().replace_user(user.clone());
        } else {
            tracing::debug!("session changed during refresh; keeping current identity");
        }
        Ok(user)
    }
}
