// src/services/crud.rs

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use rust_decimal::Decimal;
use tokio::sync::watch;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::{
        Patchable, Record,
        crops::{Crop, CropPatch, CropStatus},
        dashboard::DataState,
        inventory::{InventoryItem, InventoryPatch, QuantityChange},
        tasks::{Task, TaskPatch},
        tenancy::AccountState,
    },
    services::gateway::RecordStore,
};

/// Controlador de uma coleção: atualização otimista com reversão,
/// exclusão confirmada e criação validada.
///
/// Edita diretamente o estado publicado pelo `DataLoader`, então a view
/// enxerga a mudança otimista (e a reversão) no mesmo canal.
pub struct CollectionController<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    account: watch::Receiver<AccountState>,
    data: Arc<watch::Sender<DataState>>,
    deleting: Mutex<HashSet<Uuid>>,
}

impl<R: Record> CollectionController<R> {
    pub fn new(
        store: Arc<dyn RecordStore<R>>,
        account: watch::Receiver<AccountState>,
        data: Arc<watch::Sender<DataState>>,
    ) -> Self {
        Self {
            store,
            account,
            data,
            deleting: Mutex::new(HashSet::new()),
        }
    }

    pub fn rows(&self) -> Vec<R> {
        R::rows(&self.data.borrow().data).clone()
    }

    pub fn get(&self, id: Uuid) -> Option<R> {
        R::rows(&self.data.borrow().data).iter().find(|r| r.id() == id).cloned()
    }

    /// Linha com exclusão em andamento (desabilitada na view).
    pub fn is_deleting(&self, id: Uuid) -> bool {
        self.lock_deleting().contains(&id)
    }

    fn lock_deleting(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        // Um panic segurando o lock não invalida o conjunto
        self.deleting.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Durante uma resolução bloqueante a conta anterior não vale mais
    fn account_id(&self) -> Result<Uuid, AppError> {
        let account = self.account.borrow();
        if account.loading {
            return Err(AppError::AccountNotResolved);
        }
        account.account_id.ok_or(AppError::AccountNotResolved)
    }

    /// Aplica localmente, persiste, e reverte os campos tocados se o remoto falhar.
    /// Não recarrega a coleção no sucesso.
    pub async fn update(&self, id: Uuid, patch: R::Patch) -> Result<(), AppError> {
        let account_id = self.account_id()?;
        if self.is_deleting(id) {
            return Err(AppError::RowBusy(id));
        }

        let mut snapshot = None;
        self.data.send_if_modified(|s| {
            let Some(row) = R::rows_mut(&mut s.data).iter_mut().find(|r| r.id() == id) else {
                return false;
            };
            snapshot = Some(row.clone());
            patch.apply(row);
            true
        });
        let snapshot = snapshot.ok_or(AppError::RecordNotFound { collection: R::COLLECTION, id })?;

        if let Err(e) = self.store.update(account_id, id, &patch).await {
            tracing::warn!("[{}] Falha ao atualizar {}, revertendo: {}", R::COLLECTION, id, e);
            self.data.send_if_modified(|s| {
                match R::rows_mut(&mut s.data).iter_mut().find(|r| r.id() == id) {
                    Some(row) => {
                        patch.revert(row, &snapshot);
                        true
                    }
                    None => false,
                }
            });
            return Err(e);
        }

        tracing::debug!("[{}] {} atualizado", R::COLLECTION, id);
        Ok(())
    }

    /// Exige confirmação. A linha só sai do estado local depois do sucesso remoto.
    pub async fn delete(&self, id: Uuid, confirmed: bool) -> Result<(), AppError> {
        if !confirmed {
            return Err(AppError::DeleteNotConfirmed);
        }
        let account_id = self.account_id()?;
        if self.get(id).is_none() {
            return Err(AppError::RecordNotFound { collection: R::COLLECTION, id });
        }
        if !self.lock_deleting().insert(id) {
            return Err(AppError::RowBusy(id));
        }

        let result = self.store.delete(account_id, id).await;
        self.lock_deleting().remove(&id);

        match result {
            Ok(()) => {
                self.data.send_modify(|s| R::rows_mut(&mut s.data).retain(|r| r.id() != id));
                tracing::info!("[{}] {} excluído", R::COLLECTION, id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[{}] Falha ao excluir {}: {}", R::COLLECTION, id, e);
                Err(e)
            }
        }
    }

    /// Valida o formulário, carimba a conta atual e insere.
    /// Quem chama só reseta o formulário/fecha o modal em `Ok`.
    pub async fn create(&self, new: R::New) -> Result<R, AppError> {
        new.validate()?;
        let account_id = self.account_id()?;

        let row = self.store.insert(account_id, &new).await?;
        self.data.send_modify(|s| R::rows_mut(&mut s.data).push(row.clone()));
        tracing::info!("[{}] {} criado", R::COLLECTION, row.id());
        Ok(row)
    }
}

impl CollectionController<Crop> {
    /// Estágio e crescimento são gravados juntos.
    pub async fn change_status(&self, id: Uuid, status: CropStatus) -> Result<(), AppError> {
        self.update(id, CropPatch::status(status)).await
    }
}

impl CollectionController<InventoryItem> {
    pub async fn set_quantity(&self, id: Uuid, qty: Decimal) -> Result<(), AppError> {
        QuantityChange { qty }.validate()?;
        self.update(id, InventoryPatch::qty(qty)).await
    }
}

impl CollectionController<Task> {
    pub async fn set_completed(&self, id: Uuid, completed: bool) -> Result<(), AppError> {
        self.update(
            id,
            TaskPatch {
                completed: Some(completed),
                ..Default::default()
            },
        )
        .await
    }
}
