//! Session state and the shared handle the HTTP wrapper and the session store
//! both act on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use hospital_rbac_auth::{Action, Resource, Role, UserIdentity, View, action_allowed, view_allowed};

use crate::navigation::Navigator;
use crate::token_store::TokenStore;

/// Authentication state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Initial check of a persisted token is running.
    Bootstrapping,
    Unauthenticated,
    Authenticated,
}

/// Current identity, token and bootstrap flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserIdentity>,
    pub token: Option<String>,

    /// True only while the bootstrap check is running.
    pub loading: bool,

    pub authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// State at process start.
    pub fn bootstrapping() -> Self {
        Self {
            loading: true,
            ..Self::unauthenticated()
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            user: None,
            token: None,
            loading: false,
            authenticated_at: None,
        }
    }

    pub fn authenticated(token: String, user: UserIdentity) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
            loading: false,
            authenticated_at: Some(Utc::now()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Bootstrapping
        } else if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }

    pub fn role(&self) -> Option<&Role> {
        self.user.as_ref().map(|u| &u.role_name)
    }

    /// View gate for the signed-in user; false when signed out.
    pub fn can_access_view(&self, view: View) -> bool {
        self.authenticated_role()
            .is_some_and(|role| view_allowed(role.as_str(), view))
    }

    /// Action gate for the signed-in user; false when signed out.
    pub fn can_perform(&self, resource: Resource, action: Action) -> bool {
        self.authenticated_role()
            .is_some_and(|role| action_allowed(role.as_str(), resource, action))
    }

    fn authenticated_role(&self) -> Option<&Role> {
        if self.is_authenticated() { self.role() } else { None }
    }
}

/// Shared, cloneable access to the one session of an application.
///
/// Owns the in-memory [`Session`], the persisted token and the navigator, so
/// that any component (notably the HTTP wrapper on a 401) can clear all three
/// consistently.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<Session>>,
    tokens: Arc<dyn TokenStore>,
    navigator: Navigator,
}

impl SessionHandle {
    pub fn new(tokens: Arc<dyn TokenStore>, navigator: Navigator) -> Self {
        let (tx, _rx) = watch::channel(Session::bootstrapping());
        Self {
            state: Arc::new(tx),
            tokens,
            navigator,
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub(crate) fn tokens(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }

    pub(crate) fn begin_bootstrap(&self) {
        self.state.send_modify(|s| s.loading = true);
    }

    /// Bootstrap found a persisted token; attach it so `/auth/me` carries it.
    pub(crate) fn adopt_token(&self, token: String) {
        self.state.send_modify(|s| {
            s.token = Some(token);
            s.user = None;
        });
    }

    pub(crate) fn finish_bootstrap(&self, user: UserIdentity) {
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.loading = false;
            s.authenticated_at = Some(Utc::now());
        });
    }

    /// Persist `token` and enter the authenticated state.
    pub(crate) fn establish(&self, token: String, user: UserIdentity) {
        if let Err(e) = self.tokens.save(&token) {
            // The in-memory session still works; it just won't survive a restart.
            tracing::error!(error = %e, "failed to persist auth token");
        }

        tracing::info!(username = %user.username, role = %user.role_name, "session established");
        self.state.send_replace(Session::authenticated(token, user));
    }

    pub(crate) fn replace_user(&self, user: UserIdentity) {
        self.state.send_modify(|s| s.user = Some(user));
    }

    /// Drop the persisted token and the in-memory session.
    pub(crate) fn clear(&self) {
        if let Err(e) = self.tokens.clear() {
            tracing::error!(error = %e, "failed to remove persisted auth token");
        }
        self.state.send_replace(Session::unauthenticated());
    }

    /// Forced logout after the backend rejected the token.
    pub fn evict(&self) {
        let was_authenticated = self.state.borrow().is_authenticated();
        self.clear();
        self.navigator.redirect_to_login();

        if was_authenticated {
            tracing::warn!("session evicted after 401 response");
        } else {
            tracing::debug!("401 response without an authenticated session");
        }
    }
}
