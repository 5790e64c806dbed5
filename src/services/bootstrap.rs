// src/services/bootstrap.rs

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    common::error::AppError,
    models::auth::{AuthChange, AuthEvent, AuthState, Session},
    services::{
        events::Subscription,
        gateway::AuthGateway,
        session_cache::{SessionStore, purge_auth_entries, read_cached_session},
    },
};

/// Aquisição de sessão em duas fases:
///
/// 1. **Otimista** (síncrona): lê o cache local e publica `{ user, authReady: true }`
///    antes de qualquer I/O remoto.
/// 2. **Autoritativa** (em background): valida com o gateway e reconcilia.
///    O resultado do gateway vence, a menos que um evento de auth mais novo já
///    tenha chegado.
pub struct SessionBootstrapper {
    state: watch::Receiver<AuthState>,
    shared: Arc<Shared>,
    verify_task: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
}

struct Shared {
    gateway: Arc<dyn AuthGateway>,
    store: SessionStore,
    state: watch::Sender<AuthState>,
    // Limpo no teardown; nenhuma task muta o estado depois disso
    active: AtomicBool,
    // Incrementado a cada evento de auth
    events_seen: AtomicU64,
    verify_timeout: Duration,
}

impl Shared {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Algum evento de auth chegou desde `events_before`?
    fn superseded_since(&self, events_before: u64) -> bool {
        self.events_seen.load(Ordering::SeqCst) != events_before
    }

    fn set_user(&self, user: Option<crate::models::auth::User>) {
        if !self.is_active() {
            return;
        }
        self.state.send_if_modified(|s| {
            if s.user == user {
                return false;
            }
            s.user = user;
            true
        });
    }

    /// Logout com limite de tempo: o gateway pode estar fora do ar.
    async fn sign_out_quietly(&self) {
        match tokio::time::timeout(self.verify_timeout, self.gateway.sign_out()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("[Auth] signOut falhou: {}", e),
            Err(_) => tracing::warn!("[Auth] signOut sem resposta"),
        }
    }
}

impl SessionBootstrapper {
    /// Roda uma vez na inicialização. Precisa de um runtime tokio ativo.
    pub fn start(gateway: Arc<dyn AuthGateway>, store: SessionStore, verify_timeout: Duration) -> Self {
        // Fase otimista: nenhum await até aqui
        let cached = read_cached_session(&store);
        match &cached {
            Some(session) => tracing::info!("[Auth] Sessão local para {}", session.user.email),
            None => tracing::info!("[Auth] Nenhuma sessão local"),
        }

        let (tx, rx) = watch::channel(AuthState {
            user: cached.as_ref().map(|s| s.user.clone()),
            auth_ready: true,
        });

        let shared = Arc::new(Shared {
            gateway,
            store,
            state: tx,
            active: AtomicBool::new(true),
            events_seen: AtomicU64::new(0),
            verify_timeout,
        });

        // Assina antes de verificar, para não perder eventos emitidos pela verificação
        let subscription = {
            let shared = shared.clone();
            Subscription::spawn(shared.gateway.subscribe(), move |change| {
                let shared = shared.clone();
                async move { on_auth_change(&shared, change).await }
            })
        };

        // Qualquer evento a partir daqui supera a verificação
        let events_before = shared.events_seen.load(Ordering::SeqCst);
        let verify_task = tokio::spawn(verify_in_background(shared.clone(), cached, events_before));

        Self {
            state: rx,
            shared,
            verify_task: Some(verify_task),
            subscription: Some(subscription),
        }
    }

    /// `{ user, authReady }` observável.
    pub fn state(&self) -> watch::Receiver<AuthState> {
        self.state.clone()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Aguarda a fase autoritativa terminar (útil na inicialização e em testes).
    pub async fn verified(&mut self) {
        if let Some(task) = self.verify_task.take() {
            let _ = task.await;
        }
    }

    /// Logout local: zera o usuário sem passar pelo gateway.
    /// Uma verificação ainda em voo é descartada.
    pub fn clear_user(&self) {
        self.shared.events_seen.fetch_add(1, Ordering::SeqCst);
        self.shared.set_user(None);
    }

    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.shared.active.store(false, Ordering::SeqCst);
        if let Some(task) = self.verify_task.take() {
            task.abort();
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for SessionBootstrapper {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn verify_in_background(shared: Arc<Shared>, cached: Option<Session>, events_before: u64) {
    let outcome = tokio::time::timeout(shared.verify_timeout, shared.gateway.get_session())
        .await
        .unwrap_or(Err(AppError::Timeout("verificação de sessão")));

    if !shared.is_active() {
        return;
    }
    if shared.superseded_since(events_before) {
        tracing::debug!("[Auth] Verificação superada por um evento mais novo");
        return;
    }

    match outcome {
        Ok(session) => {
            match &session {
                Some(s) => tracing::info!("[Auth] Sessão confirmada para {}", s.user.email),
                None => tracing::info!("[Auth] Gateway sem sessão ativa"),
            }
            shared.set_user(session.map(|s| s.user));
        }
        Err(e) if e.is_transient() => {
            if cached.is_some() {
                // O cache era válido: mantém o usuário, sem piscar para "deslogado"
                tracing::warn!("[Auth] Verificação falhou ({}), mantendo a sessão local", e);
                return;
            }
            tracing::warn!("[Auth] Verificação falhou ({}), recuperando localmente", e);
            shared.sign_out_quietly().await;
            if shared.superseded_since(events_before) {
                tracing::debug!("[Auth] Evento novo durante o logout, mantendo o estado dele");
                return;
            }
            let purged = purge_auth_entries(&shared.store);
            if purged > 0 {
                tracing::info!("[Auth] {} entradas locais removidas", purged);
            }
            shared.set_user(None);
        }
        Err(e) => {
            // Token rejeitado ou erro inesperado: a sessão não é confiável
            if e.is_invalid_token() {
                tracing::warn!("[Auth] Token rejeitado ({}), encerrando a sessão", e);
            } else {
                tracing::error!("[Auth] Erro na verificação ({}), encerrando a sessão", e);
            }
            shared.sign_out_quietly().await;
            if shared.superseded_since(events_before) {
                tracing::debug!("[Auth] Evento novo durante o logout, mantendo o estado dele");
                return;
            }
            shared.set_user(None);
        }
    }
}

async fn on_auth_change(shared: &Shared, change: AuthChange) {
    if !shared.is_active() {
        return;
    }
    tracing::info!("[Auth] Evento: {:?}", change.event);
    shared.events_seen.fetch_add(1, Ordering::SeqCst);

    if change.event == AuthEvent::TokenRefreshFailed {
        shared.sign_out_quietly().await;
    }
    shared.set_user(change.user());
}
