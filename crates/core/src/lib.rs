//! `hospital-rbac-core`: shared building blocks for the RBAC client.
//!
//! Transport-agnostic: identifiers, the response envelope, and the error
//! taxonomy every backend call resolves to.

pub mod envelope;
pub mod error;
pub mod id;

pub use envelope::Envelope;
pub use error::{ApiError, ApiResult};
pub use id::{RoleId, UserId};
