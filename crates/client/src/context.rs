//! Top-level wiring, built once and cloned into every screen.

use std::future::Future;
use std::sync::Arc;

use hospital_rbac_auth::{Permission, UserIdentity};
use hospital_rbac_core::ApiResult;

use crate::config::{ClientConfig, ConfigError};
use crate::endpoints::{AuditApi, CrudApi, DashboardApi, PermissionsApi, RolesApi, UsersApi};
use crate::http::ApiClient;
use crate::mutation::Mutation;
use crate::navigation::Navigator;
use crate::session::{Session, SessionHandle};
use crate::session_store::SessionStore;
use crate::token_store::{FileTokenStore, TokenStore};

#[derive(Debug, Clone)]
pub struct AppContext {
    config: Arc<ClientConfig>,
    session: SessionHandle,
    api: ApiClient,
    store: SessionStore,
}

impl AppContext {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ConfigError> {
        let config = Arc::new(config);
        let session = SessionHandle::new(tokens, Navigator::new());
        let api = ApiClient::new(Arc::clone(&config), session.clone())?;
        let store = SessionStore::new(api.clone());

        Ok(Self {
            config,
            session,
            api,
            store,
        })
    }

    /// Context from `HOSPITAL_API_URL` / `HOSPITAL_TOKEN_PATH`, persisting
    /// the token in a file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ClientConfig::from_env()?;
        let tokens = FileTokenStore::new(config.token_path()?);
        tracing::debug!(base_url = %config.base_url(), token_path = %tokens.path().display(), "client configured");
        Self::new(config, Arc::new(tokens))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    pub fn session_handle(&self) -> &SessionHandle {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        self.session.navigator()
    }

    pub fn snapshot(&self) -> Session {
        self.session.snapshot()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.session.snapshot().user
    }

    /// A write operation refused locally unless the signed-in role holds
    /// `permission`.
    pub fn guarded<A, T, F, Fut>(&self, permission: Permission, producer: F) -> Mutation<A, T>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        Mutation::new(producer).require(self.session.clone(), permission)
    }

    pub fn dashboard(&self) -> DashboardApi<'_> {
        DashboardApi::new(&self.api)
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(&self.api)
    }

    pub fn roles(&self) -> RolesApi<'_> {
        RolesApi::new(&self.api)
    }

    pub fn permissions(&self) -> PermissionsApi<'_> {
        PermissionsApi::new(&self.api)
    }

    pub fn audit(&self) -> AuditApi<'_> {
        AuditApi::new(&self.api)
    }

    pub fn patients(&self) -> CrudApi<'_> {
        CrudApi::new(&self.api, "/patients")
    }

    pub fn appointments(&self) -> CrudApi<'_> {
        CrudApi::new(&self.api, "/appointments")
    }

    pub fn medical_records(&self) -> CrudApi<'_> {
        CrudApi::new(&self.api, "/medical-records")
    }
}
