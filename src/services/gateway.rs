// src/services/gateway.rs

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        Record,
        auth::{AuthChange, Session, User},
        crops::Crop,
        employees::Employee,
        inventory::InventoryItem,
        tasks::Task,
    },
};

// ---
// Colaboradores externos. Nada aqui é singleton: tudo é construído
// uma vez no AppState e injetado por referência (Arc).
// ---

/// O serviço remoto de autenticação.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Sessão autoritativa (valida o token persistido).
    async fn get_session(&self) -> Result<Option<Session>, AppError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;

    /// Fluxo de eventos de auth. Use `Subscription::spawn` para consumir.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// "Garante uma conta para o usuário": cria na primeira vez, devolve a mesma depois.
#[async_trait]
pub trait TenantBackend: Send + Sync {
    async fn ensure_personal_account(&self, user: &User) -> Result<Uuid, AppError>;
}

/// Operações de uma coleção, sempre filtradas/carimbadas pela conta.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    async fn select(&self, account_id: Uuid) -> Result<Vec<R>, AppError>;

    async fn insert(&self, account_id: Uuid, new: &R::New) -> Result<R, AppError>;

    async fn update(&self, account_id: Uuid, id: Uuid, patch: &R::Patch) -> Result<(), AppError>;

    async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<(), AppError>;
}

/// Todas as dependências remotas do painel.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthGateway>,
    pub tenant: Arc<dyn TenantBackend>,
    pub crops: Arc<dyn RecordStore<Crop>>,
    pub tasks: Arc<dyn RecordStore<Task>>,
    pub inventory: Arc<dyn RecordStore<InventoryItem>>,
    pub employees: Arc<dyn RecordStore<Employee>>,
}

impl Backends {
    /// Um único backend de dados atendendo a conta e as quatro coleções.
    pub fn new<B>(auth: Arc<dyn AuthGateway>, backend: Arc<B>) -> Self
    where
        B: TenantBackend
            + RecordStore<Crop>
            + RecordStore<Task>
            + RecordStore<InventoryItem>
            + RecordStore<Employee>
            + 'static,
    {
        Self {
            auth,
            tenant: backend.clone(),
            crops: backend.clone(),
            tasks: backend.clone(),
            inventory: backend.clone(),
            employees: backend,
        }
    }
}
