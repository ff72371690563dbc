use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A top-level screen of the dashboard.
///
/// The string form is the identifier used by the navigation menu.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Dashboard,
    Users,
    Roles,
    Patients,
    Appointments,
    MedicalRecords,
    Audit,
}

impl View {
    /// Menu order.
    pub const ALL: [View; 7] = [
        View::Dashboard,
        View::Users,
        View::Roles,
        View::Patients,
        View::Appointments,
        View::MedicalRecords,
        View::Audit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Dashboard => "dashboard",
            View::Users => "users",
            View::Roles => "roles",
            View::Patients => "patients",
            View::Appointments => "appointments",
            View::MedicalRecords => "medical-records",
            View::Audit => "audit",
        }
    }

    /// Header title shown for the view.
    pub fn title(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Users => "User Management",
            View::Roles => "Roles & Permissions",
            View::Patients => "Patients",
            View::Appointments => "Appointments",
            View::MedicalRecords => "Medical Records",
            View::Audit => "Audit Logs",
        }
    }
}

impl core::fmt::Display for View {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view '{0}'")]
pub struct UnknownView(pub String);

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}
