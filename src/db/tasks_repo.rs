// src/db/tasks_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        Collection,
        tasks::{NewTask, Task, TaskPatch},
    },
};

#[derive(Clone, Default)]
pub struct TaskRepository;

impl TaskRepository {
    pub fn new() -> Self {
        Self
    }

    // Sem data de entrega vai para o fim
    pub async fn get_all<'e, E>(&self, executor: E, account_id: Uuid) -> Result<Vec<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, account_id, task, due_date, completed, created_at
            FROM tasks
            WHERE account_id = $1
            ORDER BY due_date ASC NULLS LAST, created_at ASC
            "#,
        )
            .bind(account_id)
            .fetch_all(executor)
            .await?;
        Ok(tasks)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        new: &NewTask,
    ) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (account_id, task, due_date)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, task, due_date, completed, created_at
            "#,
        )
            .bind(account_id)
            .bind(new.task.trim())
            .bind(new.due_date)
            .fetch_one(executor)
            .await?;
        Ok(task)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // $4 diz se a data deve ser tocada (ela pode virar NULL)
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET task = COALESCE($3, task),
                due_date = CASE WHEN $4 THEN $5 ELSE due_date END,
                completed = COALESCE($6, completed)
            WHERE id = $1 AND account_id = $2
            "#,
        )
            .bind(id)
            .bind(account_id)
            .bind(patch.task.as_deref())
            .bind(patch.due_date.is_some())
            .bind(patch.due_date.flatten())
            .bind(patch.completed)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound { collection: Collection::Tasks, id });
        }
        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, account_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound { collection: Collection::Tasks, id });
        }
        Ok(())
    }
}
