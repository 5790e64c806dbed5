// src/services/events.rs

use std::future::Future;

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::models::auth::AuthChange;

const DEFAULT_CAPACITY: usize = 64;

/// Hub de eventos de auth (broadcast). Cada gateway tem o seu.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthChange>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AuthEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Sem assinantes o evento é descartado.
    pub fn publish(&self, change: AuthChange) {
        tracing::debug!("[Auth] Evento: {:?}", change.event);
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.sender.subscribe()
    }
}

/// Assinatura ativa. `unsubscribe()` (ou drop) encerra o listener.
#[derive(Debug)]
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Consome o receiver em uma task, chamando `handler` para cada evento.
    pub fn spawn<F, Fut>(mut rx: broadcast::Receiver<AuthChange>, mut handler: F) -> Self
    where
        F: FnMut(AuthChange) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => handler(change).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[Auth] Listener atrasado, {} eventos perdidos", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn unsubscribe(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}
