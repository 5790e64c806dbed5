// src/db/employees_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        Collection,
        employees::{Employee, EmployeePatch, NewEmployee},
    },
};

#[derive(Clone, Default)]
pub struct EmployeeRepository;

impl EmployeeRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_all<'e, E>(&self, executor: E, account_id: Uuid) -> Result<Vec<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employees = sqlx::query_as::<_, Employee>(
            "SELECT id, account_id, name, role, created_at FROM employees WHERE account_id = $1 ORDER BY name ASC",
        )
            .bind(account_id)
            .fetch_all(executor)
            .await?;
        Ok(employees)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        new: &NewEmployee,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (account_id, name, role)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, name, role, created_at
            "#,
        )
            .bind(account_id)
            .bind(new.name.trim())
            .bind(new.role.trim())
            .fetch_one(executor)
            .await?;
        Ok(employee)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        id: Uuid,
        patch: &EmployeePatch,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET name = COALESCE($3, name),
                role = COALESCE($4, role)
            WHERE id = $1 AND account_id = $2
            "#,
        )
            .bind(id)
            .bind(account_id)
            .bind(patch.name.as_deref())
            .bind(patch.role.as_deref())
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound { collection: Collection::Employees, id });
        }
        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, account_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound { collection: Collection::Employees, id });
        }
        Ok(())
    }
}
