//! Typed groups over the screen endpoints.
//!
//! Payload shapes belong to the screens, so everything here returns
//! `serde_json::Value`; the envelope and token handling come from
//! [`ApiClient`].

use serde::Serialize;
use serde_json::{Value, json};

use hospital_rbac_core::{ApiResult, RoleId, UserId};

use crate::http::ApiClient;

/// Query string pairs.
pub type Params<'p> = [(&'p str, String)];

/// List/get/create/update/delete under one collection path.
#[derive(Debug, Clone, Copy)]
pub struct CrudApi<'a> {
    api: &'a ApiClient,
    base: &'static str,
}

impl<'a> CrudApi<'a> {
    pub fn new(api: &'a ApiClient, base: &'static str) -> Self {
        Self { api, base }
    }

    pub fn base(&self) -> &'static str {
        self.base
    }

    pub async fn list(&self, params: &Params<'_>) -> ApiResult<Value> {
        self.api.get_with_query(self.base, params).await
    }

    pub async fn get(&self, id: i64) -> ApiResult<Value> {
        self.api.get(&format!("{}/{}", self.base, id)).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> ApiResult<Value> {
        self.api.post(self.base, body).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: i64, body: &B) -> ApiResult<Value> {
        self.api.put(&format!("{}/{}", self.base, id), body).await
    }

    pub async fn delete(&self, id: i64) -> ApiResult<Value> {
        self.api.delete(&format!("{}/{}", self.base, id)).await
    }
}

/// `/dashboard/*`
#[derive(Debug, Clone, Copy)]
pub struct DashboardApi<'a> {
    api: &'a ApiClient,
}

impl<'a> DashboardApi<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn stats(&self) -> ApiResult<Value> {
        self.api.get("/dashboard/stats").await
    }

    pub async fn activities(&self, limit: u32) -> ApiResult<Value> {
        self.api
            .get_with_query("/dashboard/activities", &[("limit", limit.to_string())])
            .await
    }

    pub async fn role_distribution(&self) -> ApiResult<Value> {
        self.api.get("/dashboard/role-distribution").await
    }
}

/// `/users`
#[derive(Debug, Clone, Copy)]
pub struct UsersApi<'a> {
    crud: CrudApi<'a>,
}

impl<'a> UsersApi<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self {
            crud: CrudApi::new(api, "/users"),
        }
    }

    pub fn crud(&self) -> CrudApi<'a> {
        self.crud
    }

    pub async fn assign_role(&self, user: UserId, role: RoleId) -> ApiResult<Value> {
        self.crud
            .api
            .post(&format!("/users/{}/roles", user), &json!({ "roleId": role }))
            .await
    }
}

/// `/roles`
#[derive(Debug, Clone, Copy)]
pub struct RolesApi<'a> {
    crud: CrudApi<'a>,
}

impl<'a> RolesApi<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self {
            crud: CrudApi::new(api, "/roles"),
        }
    }

    pub fn crud(&self) -> CrudApi<'a> {
        self.crud
    }

    pub async fn permissions(&self, role: RoleId) -> ApiResult<Value> {
        self.crud.api.get(&format!("/roles/{}/permissions", role)).await
    }

    pub async fn update_permissions(&self, role: RoleId, permissions: &[String]) -> ApiResult<Value> {
        self.crud
            .api
            .put(
                &format!("/roles/{}/permissions", role),
                &json!({ "permissions": permissions }),
            )
            .await
    }
}

/// `/permissions/*` (the database GRANT mirror).
#[derive(Debug, Clone, Copy)]
pub struct PermissionsApi<'a> {
    api: &'a ApiClient,
}

impl<'a> PermissionsApi<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn matrix(&self) -> ApiResult<Value> {
        self.api.get("/permissions/matrix").await
    }

    pub async fn by_role(&self, role: RoleId) -> ApiResult<Value> {
        self.api.get(&format!("/permissions/role/{}", role)).await
    }

    pub async fn grant(&self, role: RoleId, resource: &str, action: &str) -> ApiResult<Value> {
        self.api
            .post("/permissions/grant", &grant_body(role, resource, action))
            .await
    }

    pub async fn revoke(&self, role: RoleId, resource: &str, action: &str) -> ApiResult<Value> {
        self.api
            .post("/permissions/revoke", &grant_body(role, resource, action))
            .await
    }
}

fn grant_body(role: RoleId, resource: &str, action: &str) -> Value {
    json!({ "roleId": role, "resource": resource, "action": action })
}

/// Time window of the audit log filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    Today,
    Week,
    Month,
    All,
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Today => "today",
            DateRange::Week => "week",
            DateRange::Month => "month",
            DateRange::All => "all",
        }
    }
}

/// Filters accepted by `/audit/logs` and `/audit/export`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    pub date_range: DateRange,

    /// `success` / `failed`; `None` means all.
    pub status: Option<String>,

    pub limit: u32,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            date_range: DateRange::Today,
            status: None,
            limit: 50,
        }
    }
}

impl AuditQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("dateRange", self.date_range.as_str().to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        params
    }
}

/// `/audit/*`
#[derive(Debug, Clone, Copy)]
pub struct AuditApi<'a> {
    api: &'a ApiClient,
}

impl<'a> AuditApi<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn logs(&self, query: &AuditQuery) -> ApiResult<Value> {
        self.api.get_with_query("/audit/logs", &query.to_params()).await
    }

    pub async fn failed_logins(&self, limit: u32) -> ApiResult<Value> {
        self.api
            .get_with_query("/audit/failed-logins", &[("limit", limit.to_string())])
            .await
    }

    pub async fn security_alerts(&self) -> ApiResult<Value> {
        self.api.get("/audit/alerts").await
    }

    pub async fn stats(&self) -> ApiResult<Value> {
        self.api.get("/audit/stats").await
    }

    pub async fn export(&self, query: &AuditQuery) -> ApiResult<Value> {
        self.api.get_with_query("/audit/export", &query.to_params()).await
    }
}
