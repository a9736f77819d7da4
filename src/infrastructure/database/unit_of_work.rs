//! Unit of Work Pattern Implementation
//!
//! Applies a [`ChangeSet`] inside a single PostgreSQL transaction. Either
//! every staged category and channel row is written or none is.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{ChangeSet, UnitOfWork};
use crate::infrastructure::repositories::category_repository::upsert_category;
use crate::infrastructure::repositories::channel_repository::upsert_channel;
use crate::shared::error::AppError;

/// PostgreSQL Unit of Work implementation.
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply(
        tx: &mut Transaction<'static, Postgres>,
        changes: &ChangeSet,
    ) -> Result<(), AppError> {
        for category in &changes.categories {
            upsert_category(&mut **tx, category).await?;
        }
        for channel in &changes.channels {
            upsert_channel(&mut **tx, channel).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(&self, changes: ChangeSet) -> Result<(), AppError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        match Self::apply(&mut tx, &changes).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed after commit error");
                }
                Err(e)
            }
        }
    }
}
