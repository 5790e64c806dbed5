// src/db/crops_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        Collection,
        crops::{Crop, CropPatch, NewCrop},
    },
};

#[derive(Clone, Default)]
pub struct CropRepository;

impl CropRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_all<'e, E>(&self, executor: E, account_id: Uuid) -> Result<Vec<Crop>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let crops = sqlx::query_as::<_, Crop>(
            r#"
            SELECT id, account_id, name, status, growth, created_at
            FROM crops
            WHERE account_id = $1
            ORDER BY created_at ASC
            "#,
        )
            .bind(account_id)
            .fetch_all(executor)
            .await?;
        Ok(crops)
    }

    /// O crescimento inicial sai da tabela de estágios, nunca do formulário.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        new: &NewCrop,
    ) -> Result<Crop, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let crop = sqlx::query_as::<_, Crop>(
            r#"
            INSERT INTO crops (account_id, name, status, growth)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id, name, status, growth, created_at
            "#,
        )
            .bind(account_id)
            .bind(new.name.trim())
            .bind(new.status)
            .bind(new.growth_preview())
            .fetch_one(executor)
            .await?;
        Ok(crop)
    }

    // `status` e `growth` são gravados no mesmo UPDATE
    pub async fn update<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        id: Uuid,
        patch: &CropPatch,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crops
            SET name = COALESCE($3, name),
                status = COALESCE($4, status),
                growth = COALESCE($5, growth)
            WHERE id = $1 AND account_id = $2
            "#,
        )
            .bind(id)
            .bind(account_id)
            .bind(patch.name.as_deref())
            .bind(patch.status)
            .bind(patch.growth())
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound { collection: Collection::Crops, id });
        }
        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, account_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM crops WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound { collection: Collection::Crops, id });
        }
        Ok(())
    }
}
