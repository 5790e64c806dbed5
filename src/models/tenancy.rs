// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---
// 1. Account (O "Tenant")
// ---
// Uma conta pessoal por usuário; todo registro pertence a uma conta
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ---
// 2. AccountState (observável: `{ accountId, loading }`)
// ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: Option<Uuid>,
    // Usuário para quem `account_id` foi resolvido
    pub owner_id: Option<Uuid>,
    pub loading: bool,
}

impl AccountState {
    /// A conta só vale para o usuário que a resolveu, e nunca durante uma
    /// resolução bloqueante.
    pub fn account_for(&self, user_id: Uuid) -> Option<Uuid> {
        if self.loading || self.owner_id != Some(user_id) {
            return None;
        }
        self.account_id
    }
}

impl Default for AccountState {
    // Começa "carregando": a resolução inicial é bloqueante
    fn default() -> Self {
        Self {
            account_id: None,
            owner_id: None,
            loading: true,
        }
    }
}
