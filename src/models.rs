// src/models.rs

pub mod auth;
pub mod crops;
pub mod dashboard;
pub mod employees;
pub mod inventory;
pub mod tasks;
pub mod tenancy;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::dashboard::DashboardData;

/// As quatro coleções com escopo de conta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Crops,
    Tasks,
    Inventory,
    Employees,
}

impl Collection {
    /// Nome da tabela no banco.
    pub fn table(self) -> &'static str {
        match self {
            Collection::Crops => "crops",
            Collection::Tasks => "tasks",
            Collection::Inventory => "inventory",
            Collection::Employees => "employees",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Liga uma entidade aos tipos de criação e de atualização parcial.
pub trait Record: Clone + Send + Sync + 'static {
    type New: Validate + Send + Sync + 'static;
    type Patch: Patchable<Self> + Clone + Send + Sync + 'static;

    const COLLECTION: Collection;

    fn id(&self) -> Uuid;

    /// A coleção desta entidade dentro do estado carregado.
    fn rows(data: &DashboardData) -> &Vec<Self>;

    fn rows_mut(data: &mut DashboardData) -> &mut Vec<Self>;
}

/// Atualização parcial aplicada localmente (otimista) e revertida em caso de erro.
pub trait Patchable<R> {
    /// Aplica os campos presentes no patch.
    fn apply(&self, record: &mut R);

    /// Restaura, a partir do snapshot, somente os campos que este patch tocou.
    fn revert(&self, record: &mut R, snapshot: &R);
}
