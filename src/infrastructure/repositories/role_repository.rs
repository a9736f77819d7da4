//! Role Repository Implementation
//!
//! Permissions are kept as a JSONB array on the role row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{Permission, Role, RoleRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    description: String,
    permissions: Json<Vec<Permission>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl RoleRow {
    fn into_role(self) -> Role {
        Role {
            id: self.id,
            name: self.name,
            description: self.description,
            permissions: self.permissions.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
        }
    }
}

/// PostgreSQL role repository implementation.
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AppError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, permissions,
                   created_at, updated_at, is_deleted, deleted_at
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_role()))
    }

    async fn find_all(&self, include_deleted: bool) -> Result<Vec<Role>, AppError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, permissions,
                   created_at, updated_at, is_deleted, deleted_at
            FROM roles
            WHERE $1 OR NOT is_deleted
            ORDER BY created_at, id
            "#,
        )
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_role()).collect())
    }

    async fn insert(&self, role: &Role) -> Result<Role, AppError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO roles (id, name, description, permissions,
                               created_at, updated_at, is_deleted, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, description, permissions,
                      created_at, updated_at, is_deleted, deleted_at
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(Json(&role.permissions))
        .bind(role.created_at)
        .bind(role.updated_at)
        .bind(role.is_deleted)
        .bind(role.deleted_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_role())
    }

    async fn save(&self, role: &Role) -> Result<Role, AppError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            UPDATE roles
            SET name = $2,
                description = $3,
                permissions = $4,
                updated_at = $5,
                is_deleted = $6,
                deleted_at = $7
            WHERE id = $1
            RETURNING id, name, description, permissions,
                      created_at, updated_at, is_deleted, deleted_at
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(Json(&role.permissions))
        .bind(role.updated_at)
        .bind(role.is_deleted)
        .bind(role.deleted_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_role())
            .ok_or_else(|| AppError::not_found("Role"))
    }
}
