mod common;

use std::{sync::Arc, time::Duration};

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use tokio::sync::watch;
use uuid::Uuid;

use farm_dashboard::{
    common::error::AppError,
    models::{
        Collection,
        crops::{Crop, CropStatus, NewCrop},
        dashboard::{DashboardData, DataState},
        employees::{Employee, EmployeePatch},
        inventory::{InventoryItem, NewInventoryItem},
        tasks::Task,
        tenancy::AccountState,
    },
    services::crud::CollectionController,
};

use common::FakeBackend;

struct Fixture {
    account_id: Uuid,
    backend: Arc<FakeBackend>,
    data: Arc<watch::Sender<DataState>>,
    account_tx: watch::Sender<AccountState>,
    account_rx: watch::Receiver<AccountState>,
}

impl Fixture {
    fn new() -> Self {
        let account_id = Uuid::new_v4();
        let (account_tx, account_rx) = watch::channel(AccountState {
            account_id: Some(account_id),
            owner_id: Some(Uuid::new_v4()),
            loading: false,
        });
        let (data, _) = watch::channel(DataState::default());
        Self {
            account_id,
            backend: FakeBackend::new(),
            data: Arc::new(data),
            account_tx,
            account_rx,
        }
    }

    /// Sem conta resolvida.
    fn without_account() -> Self {
        let fixture = Self::new();
        fixture.account_tx.send_replace(AccountState {
            account_id: None,
            owner_id: None,
            loading: false,
        });
        fixture
    }

    fn publish(&self, data: DashboardData) {
        self.data.send_modify(|s| s.data = data);
    }

    fn crops(&self) -> CollectionController<Crop> {
        CollectionController::new(self.backend.clone(), self.account_rx.clone(), self.data.clone())
    }

    fn inventory(&self) -> CollectionController<InventoryItem> {
        CollectionController::new(self.backend.clone(), self.account_rx.clone(), self.data.clone())
    }

    fn tasks(&self) -> CollectionController<Task> {
        CollectionController::new(self.backend.clone(), self.account_rx.clone(), self.data.clone())
    }

    fn employees(&self) -> CollectionController<Employee> {
        CollectionController::new(self.backend.clone(), self.account_rx.clone(), self.data.clone())
    }
}

#[tokio::test]
async fn status_change_writes_growth_with_it() {
    let fx = Fixture::new();
    let crop = fx.backend.seed_crop(fx.account_id, "Tomate", CropStatus::Planted);
    fx.publish(DashboardData {
        crops: vec![crop.clone()],
        ..Default::default()
    });

    let crops = fx.crops();
    crops.change_status(crop.id, CropStatus::Flowering).await.unwrap();

    let local = crops.get(crop.id).unwrap();
    assert_eq!(local.status, CropStatus::Flowering);
    assert_eq!(local.growth, 60);
    let remote = fx.backend.crop(crop.id).unwrap();
    assert_eq!((remote.status, remote.growth), (CropStatus::Flowering, 60));
}

#[tokio::test]
async fn failed_quantity_update_reverts_to_the_old_value() {
    let fx = Fixture::new();
    let item = fx.backend.seed_item(fx.account_id, "Sementes de milho", 50);
    fx.publish(DashboardData {
        inventory: vec![item.clone()],
        ..Default::default()
    });
    fx.backend.set_write_latency(Duration::from_millis(100));
    fx.backend.fail_writes(true);

    let inventory = Arc::new(fx.inventory());
    let pending = {
        let inventory = inventory.clone();
        tokio::spawn(async move { inventory.set_quantity(item.id, Decimal::from(10)).await })
    };

    // Otimista: a nova quantidade aparece antes da resposta
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(inventory.get(item.id).unwrap().qty, Decimal::from(10));

    let result = pending.await.unwrap();
    assert_matches!(result, Err(AppError::DatabaseError(_)));
    assert_eq!(inventory.get(item.id).unwrap().qty, Decimal::from(50));
    assert_eq!(fx.backend.item(item.id).unwrap().qty, Decimal::from(50));
}

#[tokio::test]
async fn negative_quantity_is_rejected_before_any_change() {
    let fx = Fixture::new();
    let item = fx.backend.seed_item(fx.account_id, "Adubo", 40);
    fx.publish(DashboardData {
        inventory: vec![item.clone()],
        ..Default::default()
    });

    let inventory = fx.inventory();
    let result = inventory.set_quantity(item.id, Decimal::from(-1)).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
    assert_eq!(inventory.get(item.id).unwrap().qty, Decimal::from(40));
}

#[tokio::test]
async fn update_of_unknown_row_is_not_found() {
    let fx = Fixture::new();
    let missing = Uuid::new_v4();
    let result = fx.crops().change_status(missing, CropStatus::Harvested).await;
    assert_matches!(
        result,
        Err(AppError::RecordNotFound { collection: Collection::Crops, id }) if id == missing
    );
}

#[tokio::test]
async fn task_completion_is_persisted() {
    let fx = Fixture::new();
    let task = fx.backend.seed_task(fx.account_id, "Vacinar o gado", false);
    fx.publish(DashboardData {
        tasks: vec![task.clone()],
        ..Default::default()
    });

    let tasks = fx.tasks();
    tasks.set_completed(task.id, true).await.unwrap();
    assert!(tasks.get(task.id).unwrap().completed);
}

#[tokio::test]
async fn failed_employee_update_reverts_only_the_patched_field() {
    let fx = Fixture::new();
    let employee = fx.backend.seed_employee(fx.account_id, "Carlos", "Tratorista");
    fx.publish(DashboardData {
        employees: vec![employee.clone()],
        ..Default::default()
    });
    fx.backend.fail_writes(true);

    let employees = fx.employees();
    let patch = EmployeePatch {
        role: Some("Gerente".into()),
        ..Default::default()
    };
    assert!(employees.update(employee.id, patch).await.is_err());

    let local = employees.get(employee.id).unwrap();
    assert_eq!(local.role, "Tratorista");
    assert_eq!(local.name, "Carlos");
}

#[tokio::test]
async fn delete_requires_confirmation() {
    let fx = Fixture::new();
    let crop = fx.backend.seed_crop(fx.account_id, "Trigo", CropStatus::Growing);
    fx.publish(DashboardData {
        crops: vec![crop.clone()],
        ..Default::default()
    });

    let crops = fx.crops();
    assert_matches!(crops.delete(crop.id, false).await, Err(AppError::DeleteNotConfirmed));
    assert!(crops.get(crop.id).is_some());
    assert!(fx.backend.crop(crop.id).is_some());
}

#[tokio::test]
async fn delete_removes_the_row_only_after_the_backend_confirms() {
    let fx = Fixture::new();
    let crop = fx.backend.seed_crop(fx.account_id, "Trigo", CropStatus::Growing);
    fx.publish(DashboardData {
        crops: vec![crop.clone()],
        ..Default::default()
    });
    fx.backend.set_write_latency(Duration::from_millis(100));

    let crops = Arc::new(fx.crops());
    let pending = {
        let crops = crops.clone();
        tokio::spawn(async move { crops.delete(crop.id, true).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(crops.get(crop.id).is_some());
    assert!(crops.is_deleting(crop.id));
    assert_matches!(crops.delete(crop.id, true).await, Err(AppError::RowBusy(_)));
    assert_matches!(
        crops.change_status(crop.id, CropStatus::Harvested).await,
        Err(AppError::RowBusy(_))
    );

    pending.await.unwrap().unwrap();
    assert!(crops.get(crop.id).is_none());
    assert!(!crops.is_deleting(crop.id));
    assert!(fx.backend.crop(crop.id).is_none());
}

#[tokio::test]
async fn failed_delete_keeps_the_row() {
    let fx = Fixture::new();
    let crop = fx.backend.seed_crop(fx.account_id, "Trigo", CropStatus::Growing);
    fx.publish(DashboardData {
        crops: vec![crop.clone()],
        ..Default::default()
    });
    fx.backend.fail_writes(true);

    let crops = fx.crops();
    assert!(crops.delete(crop.id, true).await.is_err());
    assert_eq!(crops.get(crop.id), Some(crop.clone()));
    assert!(!crops.is_deleting(crop.id));
}

#[tokio::test]
async fn create_validates_stamps_the_account_and_appends() {
    let fx = Fixture::new();
    let crops = fx.crops();

    let blank = crops.create(NewCrop::new("   ", CropStatus::Planted)).await;
    assert_matches!(blank, Err(AppError::ValidationError(_)));
    assert!(crops.rows().is_empty());

    let created = crops.create(NewCrop::new("Abóbora", CropStatus::Germinated)).await.unwrap();
    assert_eq!(created.account_id, fx.account_id);
    assert_eq!(created.growth, 10);
    assert_eq!(crops.rows(), vec![created.clone()]);
    assert!(fx.backend.crop(created.id).is_some());
}

#[tokio::test]
async fn create_rejects_negative_stock() {
    let fx = Fixture::new();
    let inventory = fx.inventory();

    let result = inventory
        .create(NewInventoryItem {
            item: "Calcário".into(),
            qty: Decimal::from(-5),
        })
        .await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
    assert!(inventory.rows().is_empty());
}

#[tokio::test]
async fn mutations_need_a_resolved_account() {
    let fx = Fixture::without_account();
    let crops = fx.crops();

    let result = crops.create(NewCrop::new("Arroz", CropStatus::Planted)).await;
    assert_matches!(result, Err(AppError::AccountNotResolved));
}

#[tokio::test]
async fn mutations_are_refused_while_the_account_is_being_resolved() {
    let fx = Fixture::new();
    let crop = fx.backend.seed_crop(fx.account_id, "Trigo", CropStatus::Growing);
    fx.publish(DashboardData {
        crops: vec![crop.clone()],
        ..Default::default()
    });
    // Conta antiga ainda presente, mas uma resolução bloqueante começou
    fx.account_tx.send_modify(|s| s.loading = true);

    let crops = fx.crops();
    let created = crops.create(NewCrop::new("Soja", CropStatus::Planted)).await;
    assert_matches!(created, Err(AppError::AccountNotResolved));
    assert_matches!(
        crops.change_status(crop.id, CropStatus::Harvested).await,
        Err(AppError::AccountNotResolved)
    );
    assert_matches!(crops.delete(crop.id, true).await, Err(AppError::AccountNotResolved));
    assert_eq!(fx.backend.crop(crop.id).unwrap().status, CropStatus::Growing);
}
