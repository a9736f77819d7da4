//! Role entity and repository trait.
//!
//! A role is a named set of permission grants. Roles are global to the hub
//! and soft-deleted, so a deleted role can be restored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CompositeId, EntityKind};
use crate::shared::error::AppError;

/// Actions a permission can grant or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    ManageMessages,
    ManageChannels,
    TimeoutUsers,
}

/// One grant (or explicit denial) of a permission type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "type")]
    pub permission_type: PermissionType,
    pub is_allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    /// Snowflake ID (primary key)
    pub id: i64,

    pub name: String,

    pub description: String,

    /// At most one entry per permission type
    pub permissions: Vec<Permission>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Role {
    pub fn new(id: i64, name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: description.into(),
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    pub fn composite_id(&self) -> CompositeId {
        CompositeId::new(EntityKind::Role, self.id)
    }

    pub fn has_permission_type(&self, permission_type: PermissionType) -> bool {
        self.permissions
            .iter()
            .any(|p| p.permission_type == permission_type)
    }

    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn restore(&mut self) {
        self.is_deleted = false;
        self.deleted_at = None;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Repository trait for Role data access operations.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find a role by id, including soft-deleted records.
    async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AppError>;

    /// Every role, oldest first, optionally including deleted ones.
    async fn find_all(&self, include_deleted: bool) -> Result<Vec<Role>, AppError>;

    async fn insert(&self, role: &Role) -> Result<Role, AppError>;

    /// Persist an existing role (last writer wins).
    async fn save(&self, role: &Role) -> Result<Role, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_permission_wire_format() {
        let permission = Permission {
            permission_type: PermissionType::TimeoutUsers,
            is_allowed: false,
        };
        assert_eq!(
            serde_json::to_value(permission).unwrap(),
            json!({"type": "timeout_users", "is_allowed": false})
        );
    }

    #[test]
    fn test_delete_then_restore() {
        let mut role = Role::new(1, "moderator", "");
        role.soft_delete();
        assert!(role.is_deleted && role.deleted_at.is_some());
        role.restore();
        assert!(!role.is_deleted);
        assert_eq!(role.deleted_at, None);
    }
}
