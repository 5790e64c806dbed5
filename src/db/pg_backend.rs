// src/db/pg_backend.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AccountRepository, CropRepository, EmployeeRepository, InventoryRepository, TaskRepository},
    models::{
        auth::User,
        crops::{Crop, CropPatch, NewCrop},
        employees::{Employee, EmployeePatch, NewEmployee},
        inventory::{InventoryItem, InventoryPatch, NewInventoryItem},
        tasks::{NewTask, Task, TaskPatch},
    },
    services::gateway::{RecordStore, TenantBackend},
};

/// Backend de dados direto no Postgres: conta + as quatro coleções.
#[derive(Clone)]
pub struct PgDataBackend {
    pool: PgPool,
    accounts: AccountRepository,
    crops: CropRepository,
    tasks: TaskRepository,
    inventory: InventoryRepository,
    employees: EmployeeRepository,
}

impl PgDataBackend {
    pub fn new(pool: PgPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            crops: CropRepository::new(),
            tasks: TaskRepository::new(),
            inventory: InventoryRepository::new(),
            employees: EmployeeRepository::new(),
            pool,
        }
    }
}

#[async_trait]
impl TenantBackend for PgDataBackend {
    async fn ensure_personal_account(&self, user: &User) -> Result<Uuid, AppError> {
        // Caminho comum: a conta já existe, sem escrita
        if let Some(account) = self.accounts.find_by_owner(user.id).await? {
            return Ok(account.id);
        }

        let id = self
            .accounts
            .ensure_personal_account(&self.pool, user.id, &user.email)
            .await?;
        tracing::info!("🌱 Conta pessoal criada para {}: {}", user.email, id);
        Ok(id)
    }
}

#[async_trait]
impl RecordStore<Crop> for PgDataBackend {
    async fn select(&self, account_id: Uuid) -> Result<Vec<Crop>, AppError> {
        self.crops.get_all(&self.pool, account_id).await
    }

    async fn insert(&self, account_id: Uuid, new: &NewCrop) -> Result<Crop, AppError> {
        self.crops.create(&self.pool, account_id, new).await
    }

    async fn update(&self, account_id: Uuid, id: Uuid, patch: &CropPatch) -> Result<(), AppError> {
        self.crops.update(&self.pool, account_id, id, patch).await
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.crops.delete(&self.pool, account_id, id).await
    }
}

#[async_trait]
impl RecordStore<Task> for PgDataBackend {
    async fn select(&self, account_id: Uuid) -> Result<Vec<Task>, AppError> {
        self.tasks.get_all(&self.pool, account_id).await
    }

    async fn insert(&self, account_id: Uuid, new: &NewTask) -> Result<Task, AppError> {
        self.tasks.create(&self.pool, account_id, new).await
    }

    async fn update(&self, account_id: Uuid, id: Uuid, patch: &TaskPatch) -> Result<(), AppError> {
        self.tasks.update(&self.pool, account_id, id, patch).await
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.tasks.delete(&self.pool, account_id, id).await
    }
}

#[async_trait]
impl RecordStore<InventoryItem> for PgDataBackend {
    async fn select(&self, account_id: Uuid) -> Result<Vec<InventoryItem>, AppError> {
        self.inventory.get_all(&self.pool, account_id).await
    }

    async fn insert(&self, account_id: Uuid, new: &NewInventoryItem) -> Result<InventoryItem, AppError> {
        self.inventory.create(&self.pool, account_id, new).await
    }

    async fn update(&self, account_id: Uuid, id: Uuid, patch: &InventoryPatch) -> Result<(), AppError> {
        self.inventory.update(&self.pool, account_id, id, patch).await
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.inventory.delete(&self.pool, account_id, id).await
    }
}

#[async_trait]
impl RecordStore<Employee> for PgDataBackend {
    async fn select(&self, account_id: Uuid) -> Result<Vec<Employee>, AppError> {
        self.employees.get_all(&self.pool, account_id).await
    }

    async fn insert(&self, account_id: Uuid, new: &NewEmployee) -> Result<Employee, AppError> {
        self.employees.create(&self.pool, account_id, new).await
    }

    async fn update(&self, account_id: Uuid, id: Uuid, patch: &EmployeePatch) -> Result<(), AppError> {
        self.employees.update(&self.pool, account_id, id, patch).await
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.employees.delete(&self.pool, account_id, id).await
    }
}
