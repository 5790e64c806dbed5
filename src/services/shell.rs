// src/services/shell.rs

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::{AppState, Timeouts},
    middleware::guard::{Gate, route_gate},
    models::{
        auth::{AuthState, Session, User},
        crops::Crop,
        dashboard::{DashboardSummary, DataState},
        employees::Employee,
        inventory::InventoryItem,
        tasks::Task,
        tenancy::AccountState,
    },
    services::{
        bootstrap::SessionBootstrapper,
        crud::CollectionController,
        dashboard_service::DashboardService,
        data_loader::DataLoader,
        gateway::Backends,
        session_cache::{SessionStore, purge_auth_entries},
        tenancy_service::TenantResolver,
    },
};

/// O "App": bootstrap -> conta -> dados, mais um controlador por coleção.
pub struct DashboardShell {
    backends: Backends,
    store: SessionStore,
    bootstrapper: SessionBootstrapper,
    resolver: TenantResolver,
    loader: Arc<DataLoader>,
    dashboard: DashboardService,
    driver: JoinHandle<()>,
    pub crops: CollectionController<Crop>,
    pub tasks: CollectionController<Task>,
    pub inventory: CollectionController<InventoryItem>,
    pub employees: CollectionController<Employee>,
}

impl DashboardShell {
    pub fn from_state(state: &AppState) -> Self {
        Self::start(state.backends.clone(), state.store.clone(), state.timeouts)
    }

    pub fn start(backends: Backends, store: SessionStore, timeouts: Timeouts) -> Self {
        let bootstrapper =
            SessionBootstrapper::start(backends.auth.clone(), store.clone(), timeouts.auth_verify);
        let resolver = TenantResolver::start(
            backends.auth.clone(),
            backends.tenant.clone(),
            store.clone(),
            timeouts.account_resolve,
        );
        let loader = Arc::new(DataLoader::new(backends.clone()));

        let driver = tokio::spawn(drive_data_loader(
            bootstrapper.state(),
            resolver.state(),
            loader.clone(),
        ));

        let data = loader.sender();
        Self {
            crops: CollectionController::new(backends.crops.clone(), resolver.state(), data.clone()),
            tasks: CollectionController::new(backends.tasks.clone(), resolver.state(), data.clone()),
            inventory: CollectionController::new(backends.inventory.clone(), resolver.state(), data.clone()),
            employees: CollectionController::new(backends.employees.clone(), resolver.state(), data),
            backends,
            store,
            bootstrapper,
            resolver,
            loader,
            dashboard: DashboardService::new(),
            driver,
        }
    }

    pub fn auth(&self) -> watch::Receiver<AuthState> {
        self.bootstrapper.state()
    }

    pub fn account(&self) -> watch::Receiver<AccountState> {
        self.resolver.state()
    }

    pub fn data(&self) -> watch::Receiver<DataState> {
        self.loader.state()
    }

    pub fn gate(&self) -> Gate {
        route_gate(&self.bootstrapper.current(), &self.resolver.current())
    }

    pub fn summary(&self) -> DashboardSummary {
        self.dashboard.get_summary(&self.loader.current().data)
    }

    /// Aba voltou a ficar visível.
    pub fn on_visible(&self) {
        self.resolver.on_visible();
    }

    /// Força um novo carregamento das coleções.
    pub async fn reload(&self) {
        let user = self.bootstrapper.current().user;
        let account_id = user
            .as_ref()
            .and_then(|u| self.resolver.current().account_for(u.id));
        self.loader.load(user.as_ref(), account_id).await;
    }

    /// O login emite SIGNED_IN; o resto do pipeline reage ao evento.
    /// A conta de um usuário anterior é escondida antes de retornar.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let session = self.backends.auth.sign_in_with_password(email, password).await?;
        self.resolver.hold_for(session.user.id);
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AppError> {
        self.backends.auth.sign_up(email, password).await
    }

    /// Nunca falha: conta e dados são limpos antes de qualquer chamada remota,
    /// e se o gateway falhar as entradas locais são apagadas na mão.
    pub async fn sign_out(&self) {
        tracing::info!("[Logout] Iniciando logout...");
        self.resolver.clear_account();
        self.loader.clear();

        match self.backends.auth.sign_out().await {
            Ok(()) => tracing::info!("[Logout] Sessão encerrada"),
            Err(e) => {
                tracing::error!("[Logout] Falhou: {}", e);
                purge_auth_entries(&self.store);
            }
        }
        self.bootstrapper.clear_user();
    }

    pub fn shutdown(self) {
        self.driver.abort();
        self.loader.shutdown();
        self.resolver.shutdown();
        self.bootstrapper.shutdown();
    }
}

/// Dispara o carregador sempre que o par (usuário, conta) muda.
///
/// A conta só conta quando já foi resolvida para o usuário atual. Qualquer
/// mudança do par descarta os dados e o lote em voo; o ticket do novo lote
/// é reservado aqui, antes do spawn.
async fn drive_data_loader(
    mut auth: watch::Receiver<AuthState>,
    mut account: watch::Receiver<AccountState>,
    loader: Arc<DataLoader>,
) {
    let mut last: Option<(Uuid, Uuid)> = None;
    let mut in_flight: Option<JoinHandle<()>> = None;
    loop {
        let user = auth.borrow_and_update().user.clone();
        let state = account.borrow_and_update().clone();
        let key = user
            .as_ref()
            .and_then(|user| Some((user.id, state.account_for(user.id)?)));

        if key != last {
            last = key;
            if let Some(task) = in_flight.take() {
                task.abort();
            }
            loader.clear();

            if let (Some(user), Some((_, account_id))) = (user, key) {
                let ticket = loader.begin();
                let loader = loader.clone();
                in_flight = Some(tokio::spawn(async move {
                    loader.load_with(ticket, &user, account_id).await
                }));
            }
        }

        tokio::select! {
            changed = auth.changed() => if changed.is_err() { break },
            changed = account.changed() => if changed.is_err() { break },
        }
    }
    if let Some(task) = in_flight {
        task.abort();
    }
}
