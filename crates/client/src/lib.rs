//! `hospital-rbac-client`: session, data access and navigation core of the
//! hospital RBAC front end.
//!
//! Screens receive an [`AppContext`] and use it to:
//! - sign in and out ([`SessionStore`])
//! - call the backend through [`ApiClient`], which handles the bearer token,
//!   the response envelope and 401 eviction
//! - keep per-screen async state in [`Resource`] / [`Mutation`] slots
//! - gate views and actions with the tables in `hospital_rbac_auth`

pub mod config;
pub mod context;
pub mod endpoints;
pub mod http;
pub mod mutation;
pub mod navigation;
pub mod resource;
pub mod session;
pub mod session_store;
pub mod token_store;

pub use config::{ClientConfig, ConfigError};
pub use context::AppContext;
pub use endpoints::{AuditApi, AuditQuery, CrudApi, DashboardApi, DateRange, PermissionsApi, RolesApi, UsersApi};
pub use http::{ApiClient, OnUnauthorized};
pub use mutation::{Mutation, MutationState};
pub use navigation::{NavigationError, Navigator, Route};
pub use resource::{Resource, ResourceState};
pub use session::{Session, SessionHandle, SessionPhase};
pub use session_store::SessionStore;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};
