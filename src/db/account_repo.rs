// src/db/account_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::tenancy::Account};

#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria a conta pessoal na primeira chamada e devolve a existente nas próximas.
    /// O `ON CONFLICT ... DO UPDATE` (no-op) garante o `RETURNING` nos dois casos,
    /// inclusive com duas chamadas concorrentes.
    pub async fn ensure_personal_account<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO accounts (owner_id, name)
            VALUES ($1, $2)
            ON CONFLICT (owner_id) DO UPDATE SET owner_id = EXCLUDED.owner_id
            RETURNING id
            "#,
        )
            .bind(owner_id)
            .bind(name)
            .fetch_one(executor)
            .await?;
        Ok(id)
    }

    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, owner_id, name, created_at FROM accounts WHERE owner_id = $1",
        )
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }
}
