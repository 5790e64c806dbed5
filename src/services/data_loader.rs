// src/services/data_loader.rs

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    models::{
        auth::User,
        dashboard::{DashboardData, DataState},
    },
    services::gateway::Backends,
};

/// Lote reservado por [`DataLoader::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Carrega as quatro coleções da conta em paralelo.
///
/// Tudo-ou-nada: se uma busca falhar, nenhuma coleção é tocada e `error` é
/// preenchido. Um lote superado (usuário/conta mudou) é descartado.
pub struct DataLoader {
    backends: Backends,
    state: Arc<watch::Sender<DataState>>,
    generation: AtomicU64,
    active: AtomicBool,
}

impl DataLoader {
    pub fn new(backends: Backends) -> Self {
        let (tx, _) = watch::channel(DataState::default());
        Self {
            backends,
            state: Arc::new(tx),
            generation: AtomicU64::new(0),
            active: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> watch::Receiver<DataState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> DataState {
        self.state.borrow().clone()
    }

    /// Canal compartilhado com os controladores de CRUD.
    pub(crate) fn sender(&self) -> Arc<watch::Sender<DataState>> {
        self.state.clone()
    }

    /// Só dispara com usuário **e** conta conhecidos.
    pub async fn load(&self, user: Option<&User>, account_id: Option<Uuid>) {
        let (Some(user), Some(account_id)) = (user, account_id) else {
            tracing::debug!("[Data] Sem usuário ou conta, nada a carregar");
            return;
        };
        let ticket = self.begin();
        self.load_with(ticket, user, account_id).await;
    }

    /// Reserva o próximo lote e marca `loading_data`. Quem pede primeiro
    /// recebe o ticket mais antigo, não importa em que ordem as tasks rodem.
    pub fn begin(&self) -> LoadTicket {
        let mut ticket = LoadTicket(0);
        self.state.send_modify(|s| {
            ticket = LoadTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
            s.loading_data = true;
            s.error = None;
        });
        ticket
    }

    /// Busca as coleções; o resultado só é aplicado se `ticket` ainda for o mais novo.
    pub async fn load_with(&self, ticket: LoadTicket, user: &User, account_id: Uuid) {
        let LoadTicket(generation) = ticket;
        tracing::info!("[Data] Carregando dados da conta {} ({})", account_id, user.email);

        let b = &self.backends;
        let result = tokio::try_join!(
            b.crops.select(account_id),
            b.tasks.select(account_id),
            b.inventory.select(account_id),
            b.employees.select(account_id),
        );

        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        self.state.send_if_modified(|s| {
            if self.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("[Data] Lote {} superado, descartando", generation);
                return false;
            }
            s.loading_data = false;
            match result {
                Ok((crops, tasks, inventory, employees)) => {
                    tracing::info!(
                        "[Data] {} culturas, {} tarefas, {} itens, {} funcionários",
                        crops.len(),
                        tasks.len(),
                        inventory.len(),
                        employees.len()
                    );
                    s.data = DashboardData {
                        crops,
                        tasks,
                        inventory,
                        employees,
                    };
                }
                Err(e) => {
                    tracing::error!("[Data] Falha ao carregar: {}", e);
                    s.error = Some(e.user_message());
                }
            }
            true
        });
    }

    /// Descarta o que estiver em voo e esvazia as coleções (logout/troca de conta).
    pub fn clear(&self) {
        self.state.send_modify(|s| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *s = DataState::default();
        });
    }

    pub fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
