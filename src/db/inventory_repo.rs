// src/db/inventory_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        Collection,
        inventory::{InventoryItem, InventoryPatch, NewInventoryItem},
    },
};

#[derive(Clone, Default)]
pub struct InventoryRepository;

impl InventoryRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_all<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
    ) -> Result<Vec<InventoryItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, InventoryItem>(
            "SELECT id, account_id, item, qty, created_at FROM inventory WHERE account_id = $1 ORDER BY item ASC",
        )
            .bind(account_id)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        new: &NewInventoryItem,
    ) -> Result<InventoryItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            INSERT INTO inventory (account_id, item, qty)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, item, qty, created_at
            "#,
        )
            .bind(account_id)
            .bind(new.item.trim())
            .bind(new.qty)
            .fetch_one(executor)
            .await?;
        Ok(item)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        id: Uuid,
        patch: &InventoryPatch,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET item = COALESCE($3, item),
                qty = COALESCE($4, qty)
            WHERE id = $1 AND account_id = $2
            "#,
        )
            .bind(id)
            .bind(account_id)
            .bind(patch.item.as_deref())
            .bind(patch.qty)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound { collection: Collection::Inventory, id });
        }
        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, account_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM inventory WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound { collection: Collection::Inventory, id });
        }
        Ok(())
    }
}
