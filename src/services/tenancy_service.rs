// src/services/tenancy_service.rs

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{AuthChange, AuthEvent, User},
        tenancy::AccountState,
    },
    services::{
        events::Subscription,
        gateway::{AuthGateway, TenantBackend},
        session_cache::{SessionStore, read_cached_session},
    },
};

/// Resolve a conta (tenant) do usuário atual e mantém `{ accountId, loading }`.
///
/// Cada disparo abre uma nova "geração"; só o resultado da geração mais
/// recente é aplicado. `SIGNED_OUT` também abre uma geração, então uma
/// resolução em voo nunca escreve um accountId depois do logout.
pub struct TenantResolver {
    inner: Arc<ResolverInner>,
    subscription: Option<Subscription>,
}

struct ResolverInner {
    gateway: Arc<dyn AuthGateway>,
    tenants: Arc<dyn TenantBackend>,
    store: SessionStore,
    timeout: Duration,
    state: watch::Sender<AccountState>,
    generation: AtomicU64,
    active: AtomicBool,
}

impl TenantResolver {
    /// Inicia com uma resolução bloqueante e passa a ouvir os eventos de auth.
    pub fn start(
        gateway: Arc<dyn AuthGateway>,
        tenants: Arc<dyn TenantBackend>,
        store: SessionStore,
        timeout: Duration,
    ) -> Self {
        let (tx, _) = watch::channel(AccountState::default());
        let inner = Arc::new(ResolverInner {
            gateway,
            tenants,
            store,
            timeout,
            state: tx,
            generation: AtomicU64::new(0),
            active: AtomicBool::new(true),
        });

        let subscription = {
            let inner = inner.clone();
            Subscription::spawn(inner.gateway.subscribe(), move |change| {
                inner.clone().on_auth_change(change);
                async {}
            })
        };

        // Inicial (bloqueante)
        tokio::spawn(inner.clone().resolve(true));

        Self {
            inner,
            subscription: Some(subscription),
        }
    }

    pub fn state(&self) -> watch::Receiver<AccountState> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> AccountState {
        self.inner.state.borrow().clone()
    }

    /// `resolveAccount({ blocking })`. Termina quando esta resolução termina.
    pub async fn resolve_account(&self, blocking: bool) {
        self.inner.clone().resolve(blocking).await;
    }

    /// Aba/janela voltou a ficar visível: refresh silencioso.
    pub fn on_visible(&self) {
        tokio::spawn(self.inner.clone().resolve(false));
    }

    /// Zera o accountId imediatamente (logout), sem esperar nenhuma chamada.
    pub fn clear_account(&self) {
        self.inner.clear();
    }

    /// Um login acabou de acontecer: esconde a conta atual se ela pertence a
    /// outro usuário. Não abre geração; quem resolve é o evento `SIGNED_IN`.
    pub fn hold_for(&self, user_id: Uuid) {
        self.inner.state.send_if_modified(|s| {
            if s.account_id.is_none() || s.owner_id == Some(user_id) {
                return false;
            }
            s.account_id = None;
            s.owner_id = None;
            s.loading = true;
            true
        });
    }

    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.inner.active.store(false, Ordering::SeqCst);
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for TenantResolver {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl ResolverInner {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    // Roda dentro do handler de eventos: nada aqui pode esperar
    fn on_auth_change(self: Arc<Self>, change: AuthChange) {
        if !self.is_active() {
            return;
        }
        tracing::debug!("[Account] Evento de auth: {:?}", change.event);

        if change.event == AuthEvent::SignedOut {
            self.clear();
            return;
        }

        // Bloqueia no login e sempre que o evento traz outro usuário
        let owner = self.state.borrow().owner_id;
        let switched = change.user().map(|u| u.id) != owner;
        let blocking = change.event == AuthEvent::SignedIn || switched;

        // A conta anterior some já aqui, antes de qualquer await
        let generation = self.begin(blocking);
        tokio::spawn(self.run(generation));
    }

    fn clear(&self) {
        if !self.is_active() {
            return;
        }
        self.state.send_modify(|s| {
            // A geração sobe sob o mesmo lock da escrita
            self.generation.fetch_add(1, Ordering::SeqCst);
            s.account_id = None;
            s.owner_id = None;
            s.loading = false;
        });
        tracing::info!("[Account] Logout: accountId limpo");
    }

    async fn resolve(self: Arc<Self>, blocking: bool) {
        let generation = self.begin(blocking);
        self.run(generation).await;
    }

    async fn run(self: Arc<Self>, generation: u64) {
        let Some(user) = self.current_user().await else {
            tracing::info!("[Account] Sem usuário, limpando accountId");
            self.finish(generation, None, None);
            return;
        };

        tracing::info!("[Account] Resolvendo conta para {}", user.email);
        let result = tokio::time::timeout(self.timeout, self.tenants.ensure_personal_account(&user))
            .await
            .unwrap_or(Err(AppError::Timeout("ensure_personal_account")));

        match result {
            Ok(account_id) => {
                tracing::info!("[Account] Conta resolvida: {}", account_id);
                self.finish(generation, Some(user.id), Some(account_id));
            }
            Err(e) => {
                // Falha fechada: sem conta confirmada, sem dados da conta
                tracing::error!("[Account] ensure_personal_account falhou: {}", e);
                self.finish(generation, None, None);
            }
        }
    }

    /// Abre uma geração. Bloqueante também esconde a conta atual até a
    /// resolução terminar.
    fn begin(&self, blocking: bool) -> u64 {
        let mut generation = 0;
        self.state.send_if_modified(|s| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if !blocking {
                return false;
            }
            let changed = !s.loading || s.account_id.is_some();
            s.account_id = None;
            s.owner_id = None;
            s.loading = true;
            changed
        });
        generation
    }

    fn finish(&self, generation: u64, owner_id: Option<Uuid>, account_id: Option<Uuid>) {
        if !self.is_active() {
            return;
        }
        self.state.send_if_modified(|s| {
            if self.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("[Account] Resolução {} superada, descartando", generation);
                return false;
            }
            let changed = s.account_id != account_id || s.owner_id != owner_id || s.loading;
            s.account_id = account_id;
            s.owner_id = owner_id;
            s.loading = false;
            changed
        });
    }

    /// Cache local primeiro; o gateway só se não houver sessão local.
    async fn current_user(&self) -> Option<User> {
        if let Some(session) = read_cached_session(&self.store) {
            return Some(session.user);
        }

        match tokio::time::timeout(self.timeout, self.gateway.get_session()).await {
            Ok(Ok(session)) => session.map(|s| s.user),
            Ok(Err(e)) => {
                tracing::error!("[Account] getSession falhou: {}", e);
                None
            }
            Err(_) => {
                tracing::error!("[Account] getSession sem resposta");
                None
            }
        }
    }
}
