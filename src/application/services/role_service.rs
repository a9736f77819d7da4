//! Role Service
//!
//! Role lifecycle and permission grants. Mutations of existing roles are
//! serialized so two concurrent grants cannot overwrite each other.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Permission, Role, Store};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Fields of a role edit; `None` leaves the field as it is
#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<Permission>>,
}

/// Role service trait
#[async_trait]
pub trait RoleService: Send + Sync {
    async fn create_role(
        &self,
        name: String,
        description: String,
        permissions: Vec<Permission>,
    ) -> Result<Role, AppError>;

    async fn update_role(&self, id: i64, changes: RoleChanges) -> Result<Role, AppError>;

    /// Soft-delete a live role
    async fn delete_role(&self, id: i64) -> Result<Role, AppError>;

    async fn list_roles(&self, include_deleted: bool) -> Result<Vec<Role>, AppError>;

    /// Fetch a role, deleted or not
    async fn get_role(&self, id: i64) -> Result<Role, AppError>;

    async fn restore_role(&self, id: i64) -> Result<Role, AppError>;

    async fn add_permission(&self, id: i64, permission: Permission) -> Result<Role, AppError>;

    async fn replace_permissions(
        &self,
        id: i64,
        permissions: Option<Vec<Permission>>,
    ) -> Result<Role, AppError>;
}

/// RoleService implementation
pub struct RoleServiceImpl {
    store: Store,
    ids: Arc<SnowflakeGenerator>,
    writes: Mutex<()>,
}

impl RoleServiceImpl {
    pub fn new(store: Store, ids: Arc<SnowflakeGenerator>) -> Self {
        Self {
            store,
            ids,
            writes: Mutex::new(()),
        }
    }

    async fn live_role(&self, id: i64) -> Result<Role, AppError> {
        self.store
            .roles
            .find_by_id(id)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| AppError::not_found("Role"))
    }
}

fn ensure_distinct(permissions: &[Permission]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    if permissions.iter().all(|p| seen.insert(p.permission_type)) {
        Ok(())
    } else {
        Err(AppError::InvariantViolation(
            "Permission type listed more than once".to_string(),
        ))
    }
}

#[async_trait]
impl RoleService for RoleServiceImpl {
    async fn create_role(
        &self,
        name: String,
        description: String,
        permissions: Vec<Permission>,
    ) -> Result<Role, AppError> {
        ensure_distinct(&permissions)?;
        let mut role = Role::new(self.ids.generate(), name, description);
        role.permissions = permissions;

        let role = self.store.roles.insert(&role).await?;
        tracing::info!(role_id = role.id, name = %role.name, "Role created");
        Ok(role)
    }

    async fn update_role(&self, id: i64, changes: RoleChanges) -> Result<Role, AppError> {
        if let Some(permissions) = &changes.permissions {
            ensure_distinct(permissions)?;
        }
        let _guard = self.writes.lock().await;
        let mut role = self.live_role(id).await?;
        if let Some(name) = changes.name {
            role.name = name;
        }
        if let Some(description) = changes.description {
            role.description = description;
        }
        if let Some(permissions) = changes.permissions {
            role.permissions = permissions;
        }
        role.touch();
        self.store.roles.save(&role).await
    }

    async fn delete_role(&self, id: i64) -> Result<Role, AppError> {
        let _guard = self.writes.lock().await;
        let mut role = self.live_role(id).await?;
        role.soft_delete();
        let role = self.store.roles.save(&role).await?;
        tracing::info!(role_id = id, "Role deleted");
        Ok(role)
    }

    async fn list_roles(&self, include_deleted: bool) -> Result<Vec<Role>, AppError> {
        self.store.roles.find_all(include_deleted).await
    }

    async fn get_role(&self, id: i64) -> Result<Role, AppError> {
        self.store
            .roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Role"))
    }

    async fn restore_role(&self, id: i64) -> Result<Role, AppError> {
        let _guard = self.writes.lock().await;
        let mut role = self.get_role(id).await?;
        if !role.is_deleted {
            return Err(AppError::InvariantViolation(
                "Role is not deleted".to_string(),
            ));
        }
        role.restore();
        let role = self.store.roles.save(&role).await?;
        tracing::info!(role_id = id, "Role restored");
        Ok(role)
    }

    async fn add_permission(&self, id: i64, permission: Permission) -> Result<Role, AppError> {
        let _guard = self.writes.lock().await;
        let mut role = self.live_role(id).await?;
        if role.has_permission_type(permission.permission_type) {
            return Err(AppError::InvariantViolation(
                "Permission already exists for this role".to_string(),
            ));
        }
        role.permissions.push(permission);
        role.touch();
        self.store.roles.save(&role).await
    }

    async fn replace_permissions(
        &self,
        id: i64,
        permissions: Option<Vec<Permission>>,
    ) -> Result<Role, AppError> {
        self.update_role(
            id,
            RoleChanges {
                permissions,
                ..RoleChanges::default()
            },
        )
        .await
    }
}
