//! `hospital-rbac-auth`: client-side access control (pure, no IO).
//!
//! The tables in [`authorize`] are the single source of truth for what each
//! role may see and do. The backend stays authoritative; these checks only
//! decide what the client offers.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod views;

pub use authorize::{
    AccessExplanation, AccessLevel, CapabilityMatrix, RoleCapabilities, access_level,
    accessible_views, action_allowed, can_access_view, can_perform, explain_action,
    permissions_for, view_allowed,
};
pub use permissions::{Action, Permission, Resource, UnknownAction, UnknownResource};
pub use principal::UserIdentity;
pub use roles::Role;
pub use views::{UnknownView, View};
