use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A resource whose mutations are role-gated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Users,
    Roles,
    Patients,
    Appointments,
    MedicalRecords,
    AuditLogs,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Users,
        Resource::Roles,
        Resource::Patients,
        Resource::Appointments,
        Resource::MedicalRecords,
        Resource::AuditLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Roles => "roles",
            Resource::Patients => "patients",
            Resource::Appointments => "appointments",
            Resource::MedicalRecords => "medical-records",
            Resource::AuditLogs => "audit-logs",
        }
    }
}

/// A mutation on a [`Resource`]. Reading is governed by view access instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Edit,
    Delete,
    Export,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Edit, Action::Delete, Action::Export];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Export => "export",
        }
    }
}

macro_rules! impl_lookup_by_name {
    ($t:ty, $err:ident, $what:literal) => {
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        #[error("unknown {} '{}'", $what, .0)]
        pub struct $err(pub String);

        impl FromStr for $t {
            type Err = $err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$t>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| $err(s.to_string()))
            }
        }
    };
}

impl_lookup_by_name!(Resource, UnknownResource, "resource");
impl_lookup_by_name!(Action, UnknownAction, "action");

/// A single grantable capability, e.g. `patients.create`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
}

impl Permission {
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.resource, self.action)
    }
}
