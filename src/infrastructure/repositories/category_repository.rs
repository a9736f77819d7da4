//! Category Repository Implementation
//!
//! `channels_order` is stored as a `BIGINT[]` so a category's membership
//! and ordering live in the same row as its chain pointer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::domain::{Category, CategoryRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    channels_order: Vec<i64>,
    next_category_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl CategoryRow {
    fn into_category(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
            description: self.description,
            channels_order: self.channels_order,
            next_category_id: self.next_category_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
        }
    }
}

/// Insert or fully replace a category row.
pub(crate) async fn upsert_category<'e, E>(executor: E, category: &Category) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO categories (id, name, description, channels_order, next_category_id,
                                created_at, updated_at, is_deleted, deleted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name,
            description = EXCLUDED.description,
            channels_order = EXCLUDED.channels_order,
            next_category_id = EXCLUDED.next_category_id,
            updated_at = EXCLUDED.updated_at,
            is_deleted = EXCLUDED.is_deleted,
            deleted_at = EXCLUDED.deleted_at
        "#,
    )
    .bind(category.id)
    .bind(&category.name)
    .bind(&category.description)
    .bind(&category.channels_order)
    .bind(category.next_category_id)
    .bind(category.created_at)
    .bind(category.updated_at)
    .bind(category.is_deleted)
    .bind(category.deleted_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// PostgreSQL category repository implementation.
#[derive(Clone)]
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, AppError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, description, channels_order, next_category_id,
                   created_at, updated_at, is_deleted, deleted_at
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_category()))
    }

    async fn find_live(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, description, channels_order, next_category_id,
                   created_at, updated_at, is_deleted, deleted_at
            FROM categories
            WHERE NOT is_deleted
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_category()).collect())
    }

    async fn insert(&self, category: &Category) -> Result<Category, AppError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (id, name, description, channels_order, next_category_id,
                                    created_at, updated_at, is_deleted, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, description, channels_order, next_category_id,
                      created_at, updated_at, is_deleted, deleted_at
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.channels_order)
        .bind(category.next_category_id)
        .bind(category.created_at)
        .bind(category.updated_at)
        .bind(category.is_deleted)
        .bind(category.deleted_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_category())
    }

    async fn save(&self, category: &Category) -> Result<Category, AppError> {
        upsert_category(&self.pool, category).await?;
        Ok(category.clone())
    }
}
