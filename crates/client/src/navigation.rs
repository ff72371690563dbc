//! Role-gated navigation between screens.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use hospital_rbac_auth::{Role, View, view_allowed};

use crate::session::Session;

/// Where the client currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "route", content = "view", rename_all = "snake_case")]
pub enum Route {
    Login,
    View(View),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("not signed in")]
    NotAuthenticated,

    #[error("role '{role}' may not open '{view}'")]
    Forbidden { role: Role, view: View },
}

/// Owner of the current [`Route`].
///
/// Screens subscribe to it; session eviction and logout push it back to
/// [`Route::Login`].
#[derive(Debug, Clone)]
pub struct Navigator {
    current: Arc<watch::Sender<Route>>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Route::Login);
        Self {
            current: Arc::new(tx),
        }
    }

    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }

    pub fn redirect_to_login(&self) {
        self.current.send_if_modified(|route| {
            let changed = *route != Route::Login;
            *route = Route::Login;
            changed
        });
    }

    /// Open `view` if the session's role may see it.
    ///
    /// An unauthenticated session is sent to the login route instead.
    pub fn navigate(&self, session: &Session, view: View) -> Result<(), NavigationError> {
        let Some(user) = session.user.as_ref().filter(|_| session.is_authenticated()) else {
            self.redirect_to_login();
            return Err(NavigationError::NotAuthenticated);
        };

        if !view_allowed(user.role_name.as_str(), view) {
            tracing::debug!(role = %user.role_name, %view, "navigation refused");
            return Err(NavigationError::Forbidden {
                role: user.role_name.clone(),
                view,
            });
        }

        self.current.send_replace(Route::View(view));
        Ok(())
    }

    /// Route to show right after bootstrap or login.
    pub fn landing_route(session: &Session) -> Route {
        if session.is_authenticated() {
            Route::View(View::Dashboard)
        } else {
            Route::Login
        }
    }

    /// Move to the landing route for `session`.
    pub fn land(&self, session: &Session) {
        self.current.send_replace(Self::landing_route(session));
    }
}
