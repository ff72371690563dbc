use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role name as reported by the backend (`role_name`).
///
/// Roles are open strings so that roles created on the backend still
/// round-trip; the access tables only grant anything to the names below.
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("Admin"));
    pub const DOCTOR: Role = Role(Cow::Borrowed("Doctor"));
    pub const NURSE: Role = Role(Cow::Borrowed("Nurse"));
    pub const RECEPTIONIST: Role = Role(Cow::Borrowed("Receptionist"));
    pub const BILLING: Role = Role(Cow::Borrowed("Billing"));

    /// Every role the access tables know about.
    pub const KNOWN: [Role; 5] = [
        Role::ADMIN,
        Role::DOCTOR,
        Role::NURSE,
        Role::RECEPTIONIST,
        Role::BILLING,
    ];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        Self::KNOWN.iter().any(|r| r == self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl PartialEq<str> for Role {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Role {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
