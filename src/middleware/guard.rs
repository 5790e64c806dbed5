// src/middleware/guard.rs

use uuid::Uuid;

use crate::models::{auth::AuthState, tenancy::AccountState};

/// O que a camada de view deve mostrar para uma rota protegida.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Ainda sem `authReady`.
    Loading,
    /// Sem sessão: redireciona para o login.
    Login,
    /// Sessão sem conta confirmada (ou resolução bloqueante em andamento).
    TenantLoading,
    Ready(Uuid),
}

// Equivalente ao auth_guard: existe uma sessão?
pub fn auth_guard(auth: &AuthState) -> Result<(), Gate> {
    if !auth.auth_ready {
        return Err(Gate::Loading);
    }
    if auth.user.is_none() {
        return Err(Gate::Login);
    }
    Ok(())
}

// Equivalente ao tenant_guard: a sessão tem uma conta confirmada?
pub fn tenant_guard(account: &AccountState) -> Result<Uuid, Gate> {
    if account.loading {
        return Err(Gate::TenantLoading);
    }
    account.account_id.ok_or(Gate::TenantLoading)
}

pub fn route_gate(auth: &AuthState, account: &AccountState) -> Gate {
    if let Err(gate) = auth_guard(auth) {
        return gate;
    }
    match tenant_guard(account) {
        // Conta de outro usuário (troca de login em andamento)
        Ok(_) if account.owner_id != auth.user.as_ref().map(|u| u.id) => Gate::TenantLoading,
        Ok(account_id) => Gate::Ready(account_id),
        Err(gate) => gate,
    }
}
