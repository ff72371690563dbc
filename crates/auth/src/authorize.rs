//! Static access tables and the predicates every screen consults.
//!
//! - No IO
//! - No panics
//! - Default-deny: anything not listed in a table is refused

use serde::Serialize;

use crate::{Action, Permission, Resource, Role, View};

const ADMIN: &str = "Admin";
const DOCTOR: &str = "Doctor";
const NURSE: &str = "Nurse";
const RECEPTIONIST: &str = "Receptionist";
const BILLING: &str = "Billing";

/// Which roles may open each view.
static VIEW_ACCESS: &[(View, &[&str])] = &[
    (View::Dashboard, &[ADMIN, DOCTOR, NURSE, RECEPTIONIST, BILLING]),
    (View::Users, &[ADMIN]),
    (View::Roles, &[ADMIN]),
    (View::Audit, &[ADMIN]),
    (View::Patients, &[ADMIN, DOCTOR, NURSE, RECEPTIONIST]),
    (View::Appointments, &[ADMIN, DOCTOR, NURSE, RECEPTIONIST]),
    (View::MedicalRecords, &[ADMIN, DOCTOR, NURSE]),
];

/// Which roles may perform each mutation.
static ACTION_ACCESS: &[(Resource, Action, &[&str])] = &[
    (Resource::Users, Action::Create, &[ADMIN]),
    (Resource::Users, Action::Edit, &[ADMIN]),
    (Resource::Users, Action::Delete, &[ADMIN]),
    (Resource::Roles, Action::Create, &[ADMIN]),
    (Resource::Roles, Action::Edit, &[ADMIN]),
    (Resource::Roles, Action::Delete, &[ADMIN]),
    (Resource::Patients, Action::Create, &[ADMIN, RECEPTIONIST]),
    (Resource::Patients, Action::Edit, &[ADMIN]),
    (Resource::Patients, Action::Delete, &[ADMIN]),
    (Resource::Appointments, Action::Create, &[ADMIN, RECEPTIONIST]),
    (Resource::Appointments, Action::Edit, &[ADMIN, RECEPTIONIST]),
    (Resource::Appointments, Action::Delete, &[ADMIN, RECEPTIONIST]),
    (Resource::MedicalRecords, Action::Create, &[ADMIN, DOCTOR]),
    (Resource::MedicalRecords, Action::Edit, &[ADMIN, DOCTOR]),
    (Resource::MedicalRecords, Action::Delete, &[ADMIN]),
    (Resource::AuditLogs, Action::Export, &[ADMIN]),
];

fn view_roles(view: View) -> &'static [&'static str] {
    VIEW_ACCESS
        .iter()
        .find(|(v, _)| *v == view)
        .map(|(_, roles)| *roles)
        .unwrap_or(&[])
}

fn action_roles(resource: Resource, action: Action) -> &'static [&'static str] {
    ACTION_ACCESS
        .iter()
        .find(|(r, a, _)| *r == resource && *a == action)
        .map(|(_, _, roles)| *roles)
        .unwrap_or(&[])
}

/// May `role_name` open the view identified by `view_id`?
///
/// Unknown roles and unknown view identifiers are denied.
pub fn can_access_view(role_name: &str, view_id: &str) -> bool {
    view_id
        .parse::<View>()
        .is_ok_and(|view| view_allowed(role_name, view))
}

/// May `role_name` perform `action` on `resource`?
///
/// Unknown roles, resources and actions are denied.
pub fn can_perform(role_name: &str, resource: &str, action: &str) -> bool {
    match (resource.parse::<Resource>(), action.parse::<Action>()) {
        (Ok(resource), Ok(action)) => action_allowed(role_name, resource, action),
        _ => false,
    }
}

/// Typed form of [`can_access_view`].
pub fn view_allowed(role_name: &str, view: View) -> bool {
    view_roles(view).contains(&role_name)
}

/// Typed form of [`can_perform`].
pub fn action_allowed(role_name: &str, resource: Resource, action: Action) -> bool {
    action_roles(resource, action).contains(&role_name)
}

/// Views a role may see, in menu order (sidebar filtering).
pub fn accessible_views(role: &Role) -> Vec<View> {
    View::ALL
        .into_iter()
        .filter(|v| view_allowed(role.as_str(), *v))
        .collect()
}

/// Every mutation granted to a role.
pub fn permissions_for(role: &Role) -> Vec<Permission> {
    ACTION_ACCESS
        .iter()
        .filter(|(_, _, roles)| roles.contains(&role.as_str()))
        .map(|(r, a, _)| Permission::new(*r, *a))
        .collect()
}

/// Summary of what a role can do on one screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Create, edit and delete.
    Full,
    /// Create and edit, but not delete.
    ViewCreateEdit,
    /// Create only.
    ViewAndCreate,
    /// Edit only.
    ViewAndEdit,
    /// Can open the screen but not change anything.
    ViewOnly,
    /// Cannot open the screen.
    None,
}

impl AccessLevel {
    pub fn label(&self) -> &'static str {
        match self {
            AccessLevel::Full => "Full Access",
            AccessLevel::ViewCreateEdit => "View, Create & Edit",
            AccessLevel::ViewAndCreate => "View & Create",
            AccessLevel::ViewAndEdit => "View & Edit",
            AccessLevel::ViewOnly => "View Only",
            AccessLevel::None => "No Access",
        }
    }
}

/// The screen that lists a resource.
fn view_of(resource: Resource) -> View {
    match resource {
        Resource::Users => View::Users,
        Resource::Roles => View::Roles,
        Resource::Patients => View::Patients,
        Resource::Appointments => View::Appointments,
        Resource::MedicalRecords => View::MedicalRecords,
        Resource::AuditLogs => View::Audit,
    }
}

/// Summarize a role's create/edit/delete rights on `resource`.
pub fn access_level(role: &Role, resource: Resource) -> AccessLevel {
    let role = role.as_str();
    if !view_allowed(role, view_of(resource)) {
        return AccessLevel::None;
    }

    let create = action_allowed(role, resource, Action::Create);
    let edit = action_allowed(role, resource, Action::Edit);
    let delete = action_allowed(role, resource, Action::Delete);

    match (create, edit, delete) {
        (true, true, true) => AccessLevel::Full,
        (true, true, false) => AccessLevel::ViewCreateEdit,
        (true, false, _) => AccessLevel::ViewAndCreate,
        (false, true, _) => AccessLevel::ViewAndEdit,
        _ => AccessLevel::ViewOnly,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Explanations (audit / debugging)
// ─────────────────────────────────────────────────────────────────────────────

/// Why an action was allowed or refused for a role.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub permission: String,
    pub role: String,
    pub granted: bool,
    pub reason: String,

    /// Roles the table grants this permission to.
    pub granted_to: Vec<String>,
}

/// Explain the decision [`action_allowed`] makes for `role`.
pub fn explain_action(role: &Role, resource: Resource, action: Action) -> AccessExplanation {
    let permission = Permission::new(resource, action).to_string();
    let granted_to: Vec<String> = action_roles(resource, action)
        .iter()
        .map(|r| r.to_string())
        .collect();
    let granted = action_allowed(role.as_str(), resource, action);

    let reason = if granted {
        format!("role '{}' is granted '{}'", role, permission)
    } else if granted_to.is_empty() {
        format!("'{}' is not granted to any role", permission)
    } else if !role.is_known() {
        format!("role '{}' is not a known role", role)
    } else {
        format!(
            "role '{}' lacks '{}' (granted to: {})",
            role,
            permission,
            granted_to.join(", ")
        )
    };

    AccessExplanation {
        permission,
        role: role.to_string(),
        granted,
        reason,
        granted_to,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability matrix (roles screen)
// ─────────────────────────────────────────────────────────────────────────────

/// One row of the capability matrix.
#[derive(Debug, Clone, Serialize)]
pub struct RoleCapabilities {
    pub role: String,
    pub description: Option<String>,
    pub views: Vec<View>,
    pub permissions: Vec<String>,
}

/// Every known role with the views and mutations the tables grant it.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityMatrix {
    pub roles: Vec<RoleCapabilities>,
}

impl CapabilityMatrix {
    pub fn build() -> Self {
        let roles = Role::KNOWN
            .iter()
            .map(|role| RoleCapabilities {
                role: role.to_string(),
                description: role_description(role.as_str()),
                views: accessible_views(role),
                permissions: permissions_for(role)
                    .into_iter()
                    .map(|p| p.to_string())
                    .collect(),
            })
            .collect();

        Self { roles }
    }

    pub fn get(&self, role: &Role) -> Option<&RoleCapabilities> {
        self.roles.iter().find(|r| r.role == role.as_str())
    }
}

fn role_description(role: &str) -> Option<String> {
    match role {
        ADMIN => Some("System administrator with full access".to_string()),
        DOCTOR => Some("Physician with medical record authoring rights".to_string()),
        NURSE => Some("Clinical staff with read access to patient care screens".to_string()),
        RECEPTIONIST => Some("Front desk managing patient intake and appointments".to_string()),
        BILLING => Some("Billing staff with dashboard access only".to_string()),
        _ => None,
    }
}
