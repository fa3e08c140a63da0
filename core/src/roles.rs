//! Role assignments and the role catalogue.
//!
//! The assigned collection is the one role list of the signed-in user. Every
//! load of it re-derives the capability set of the attached
//! [`PermissionResolver`], and every assignment change reloads both.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::Weak;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::gateway::HttpGateway;
use crate::models::AssignRoleRequest;
use crate::models::ListPayload;
use crate::models::PermissionRecord;
use crate::models::Role;
use crate::permissions::PermissionResolver;
use crate::permissions::RoleSource;
use crate::resource::Collection;
use crate::resource::InsertPosition;
use crate::resource::ResourceSlot;

const MY_ROLES_PATH: &str = "/users/me/roles";

#[derive(Debug)]
pub struct RolesApi {
    gateway: HttpGateway,
    assigned: Collection<Role>,
    catalogue: ResourceSlot<Vec<Role>>,
    resolver: OnceLock<Weak<PermissionResolver>>,
}

impl RolesApi {
    pub fn new(gateway: HttpGateway) -> Self {
        Self {
            gateway,
            assigned: Collection::new(),
            catalogue: ResourceSlot::new(),
            resolver: OnceLock::new(),
        }
    }

    /// Keeps `resolver` in step with the assigned roles. Only the first
    /// attachment takes effect.
    pub fn attach(&self, resolver: &Arc<PermissionResolver>) {
        if self.resolver.set(Arc::downgrade(resolver)).is_err() {
            tracing::debug!("role list already attached to a resolver");
        }
    }

    /// Roles of the signed-in user, as last synchronized.
    pub fn assigned(&self) -> &Collection<Role> {
        &self.assigned
    }

    pub fn catalogue(&self) -> &ResourceSlot<Vec<Role>> {
        &self.catalogue
    }

    pub async fn mine(&self) -> ApiResult<Vec<Role>> {
        let roles = self.assigned.fetch_all(self.fetch_my_roles()).await?;
        self.resync(roles.clone()).await;
        Ok(roles)
    }

    /// Every role defined on the server.
    pub async fn list_all(&self) -> ApiResult<Vec<Role>> {
        self.catalogue
            .run(async {
                let body: ListPayload<Role> = self.gateway.get("/roles").await?;
                Ok(body.into_vec())
            })
            .await
    }

    pub async fn permissions(&self, role_id: i64) -> ApiResult<Vec<String>> {
        let path = format!("/roles/{role_id}/permissions");
        let body: ListPayload<PermissionRecord> = self.gateway.get(&path).await?;
        Ok(body
            .into_vec()
            .into_iter()
            .map(PermissionRecord::into_name)
            .collect())
    }

    pub async fn assign(&self, user_id: i64, role_id: i64) -> ApiResult<Role> {
        let path = format!("/users/{user_id}/roles");
        let request = AssignRoleRequest { role_id };
        let role = self
            .assigned
            .create(InsertPosition::Append, self.gateway.post(&path, &request))
            .await?;
        self.reload().await;
        Ok(role)
    }

    pub async fn remove(&self, user_id: i64, role_id: i64) -> ApiResult<()> {
        let path = format!("/users/{user_id}/roles/{role_id}");
        self.assigned
            .delete(role_id, self.gateway.delete(&path))
            .await?;
        self.reload().await;
        Ok(())
    }

    fn attached(&self) -> Option<Arc<PermissionResolver>> {
        self.resolver.get().and_then(Weak::upgrade)
    }

    async fn resync(&self, roles: Vec<Role>) {
        let Some(resolver) = self.attached() else {
            return;
        };
        if let Err(err) = resolver.refresh_with_roles(roles).await {
            tracing::warn!("capability set not re-derived after role change: {err}");
        }
    }

    /// The server decides whether an assignment touched the signed-in user, so
    /// both the role list and the capability set are fetched again.
    async fn reload(&self) {
        let Some(resolver) = self.attached() else {
            return;
        };
        if let Err(err) = resolver.refresh().await {
            tracing::warn!("role list not reloaded after assignment change: {err}");
        }
    }

    async fn fetch_my_roles(&self) -> ApiResult<Vec<Role>> {
        let body: ListPayload<Role> = self.gateway.get(MY_ROLES_PATH).await?;
        Ok(body.into_vec())
    }
}

#[async_trait]
impl RoleSource for RolesApi {
    async fn my_roles(&self) -> ApiResult<Vec<Role>> {
        self.assigned.fetch_all(self.fetch_my_roles()).await
    }

    async fn role_permissions(&self, role_id: i64) -> ApiResult<Vec<String>> {
        self.permissions(role_id).await
    }
}
