// Fakes em memória do gateway de auth e do backend de dados.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use farm_dashboard::{
    common::error::AppError,
    models::{
        Collection, Patchable, Record,
        auth::{AuthChange, AuthEvent, Session, User},
        crops::{Crop, CropStatus, NewCrop, growth_for},
        employees::{Employee, NewEmployee},
        inventory::{InventoryItem, NewInventoryItem},
        tasks::{NewTask, Task},
    },
    services::{
        events::AuthEvents,
        gateway::{AuthGateway, Backends, RecordStore, TenantBackend},
        session_cache::{SessionStore, persist_session},
    },
};

pub const STORAGE_KEY: &str = "sb-fazenda-auth-token";

/// Diretório temporário + store. Segure o `TempDir` até o fim do teste.
pub fn temp_store() -> (TempDir, SessionStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::open(dir.path()).expect("store");
    (dir, store)
}

pub fn user(email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
    }
}

pub fn session_for(user: &User, expires_in_secs: i64) -> Session {
    Session {
        user: user.clone(),
        expires_at: Utc::now().timestamp() + expires_in_secs,
        access_token: format!("token-{}", Uuid::new_v4()),
        refresh_token: Some("refresh".into()),
    }
}

/// Grava uma sessão no cache local, como se um login anterior tivesse acontecido.
pub fn seed_session(store: &SessionStore, user: &User, expires_in_secs: i64) -> Session {
    let session = session_for(user, expires_in_secs);
    persist_session(store, STORAGE_KEY, &session).expect("persist");
    session
}

/// Espera até o estado observado satisfazer `pred` (ou estoura o teste).
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, pred: F) -> T
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let result = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| pred(v))).await;
    match result {
        Ok(Ok(value)) => value.clone(),
        Ok(Err(_)) => panic!("canal fechado antes da condição"),
        Err(_) => panic!("condição não atingida a tempo; último valor não confere"),
    }
}

/// Deixa as tasks em background rodarem um pouco.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

// ---
// Gateway de auth
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionReply {
    /// Devolve a sessão persistida (se ainda válida).
    Stored,
    /// Rejeita o token.
    Invalid,
    /// Falha de rede.
    Unreachable,
    /// Erro inesperado do serviço (nem token inválido, nem falha de rede).
    Broken,
}

pub struct FakeGateway {
    store: SessionStore,
    events: AuthEvents,
    users: Mutex<HashMap<String, (User, String)>>,
    reply: Mutex<SessionReply>,
    latency: Mutex<Duration>,
    sign_out_latency: Mutex<Duration>,
    fail_sign_out: AtomicBool,
    pub get_session_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new(store: SessionStore) -> Arc<Self> {
        Arc::new(Self {
            store,
            events: AuthEvents::default(),
            users: Mutex::new(HashMap::new()),
            reply: Mutex::new(SessionReply::Stored),
            latency: Mutex::new(Duration::ZERO),
            sign_out_latency: Mutex::new(Duration::ZERO),
            fail_sign_out: AtomicBool::new(false),
            get_session_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        })
    }

    pub fn with_user(self: Arc<Self>, user: &User, password: &str) -> Arc<Self> {
        self.users
            .lock()
            .unwrap()
            .insert(user.email.clone(), (user.clone(), password.to_string()));
        self
    }

    pub fn set_reply(&self, reply: SessionReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn set_sign_out_latency(&self, latency: Duration) {
        *self.sign_out_latency.lock().unwrap() = latency;
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Emite um evento como o serviço remoto faria.
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        self.events.publish(AuthChange::new(event, session));
    }

    fn latency(&self) -> Duration {
        *self.latency.lock().unwrap()
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        delay(self.latency()).await;

        let reply = *self.reply.lock().unwrap();
        match reply {
            SessionReply::Stored => {
                let raw = self.store.get(STORAGE_KEY)?;
                let Some(raw) = raw else {
                    return Ok(None);
                };
                let session: Session = match serde_json::from_str(&raw) {
                    Ok(session) => session,
                    Err(_) => return Ok(None),
                };
                if session.is_expired_at(Utc::now()) {
                    return Ok(None);
                }
                Ok(Some(session))
            }
            SessionReply::Invalid => Err(AppError::InvalidToken),
            SessionReply::Unreachable => Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut)),
            SessionReply::Broken => Err(AppError::InternalServerError(anyhow::anyhow!(
                "resposta inesperada do serviço de auth"
            ))),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let found = self.users.lock().unwrap().get(email).cloned();
        let Some((user, expected)) = found else {
            return Err(AppError::InvalidCredentials);
        };
        if expected != password {
            return Err(AppError::InvalidCredentials);
        }
        let session = seed_session(&self.store, &user, 3600);
        self.events
            .publish(AuthChange::new(AuthEvent::SignedIn, Some(session.clone())));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(AppError::EmailAlreadyExists);
        }
        let new_user = user(email);
        users.insert(email.to_string(), (new_user.clone(), password.to_string()));
        Ok(new_user)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.sign_out_latency.lock().unwrap();
        delay(latency).await;
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AppError::StorageError(std::io::Error::other("gateway fora do ar")));
        }
        self.store.remove(STORAGE_KEY)?;
        self.events.publish(AuthChange::new(AuthEvent::SignedOut, None));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

// ---
// Backend de dados (conta + coleções)
// ---
#[derive(Default)]
pub struct FakeBackend {
    accounts: Mutex<HashMap<Uuid, Uuid>>,
    ensure_latency: Mutex<Duration>,
    fail_ensure: AtomicBool,
    pub ensure_calls: AtomicUsize,

    select_latency: Mutex<Duration>,
    fail_select: Mutex<Option<Collection>>,
    write_latency: Mutex<Duration>,
    fail_writes: AtomicBool,
    pub select_calls: AtomicUsize,

    crops: Mutex<Vec<Crop>>,
    tasks: Mutex<Vec<Task>>,
    inventory: Mutex<Vec<InventoryItem>>,
    employees: Mutex<Vec<Employee>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_ensure_latency(&self, latency: Duration) {
        *self.ensure_latency.lock().unwrap() = latency;
    }

    pub fn fail_ensure(&self, fail: bool) {
        self.fail_ensure.store(fail, Ordering::SeqCst);
    }

    pub fn set_select_latency(&self, latency: Duration) {
        *self.select_latency.lock().unwrap() = latency;
    }

    pub fn fail_select(&self, collection: Option<Collection>) {
        *self.fail_select.lock().unwrap() = collection;
    }

    pub fn set_write_latency(&self, latency: Duration) {
        *self.write_latency.lock().unwrap() = latency;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn account_of(&self, owner: &User) -> Option<Uuid> {
        self.accounts.lock().unwrap().get(&owner.id).copied()
    }

    pub fn seed_crop(&self, account_id: Uuid, name: &str, status: CropStatus) -> Crop {
        let crop = Crop {
            id: Uuid::new_v4(),
            account_id,
            name: name.to_string(),
            status,
            growth: growth_for(status),
            created_at: Utc::now(),
        };
        self.crops.lock().unwrap().push(crop.clone());
        crop
    }

    pub fn seed_item(&self, account_id: Uuid, item: &str, qty: i64) -> InventoryItem {
        let row = InventoryItem {
            id: Uuid::new_v4(),
            account_id,
            item: item.to_string(),
            qty: Decimal::from(qty),
            created_at: Utc::now(),
        };
        self.inventory.lock().unwrap().push(row.clone());
        row
    }

    pub fn seed_task(&self, account_id: Uuid, task: &str, completed: bool) -> Task {
        let row = Task {
            id: Uuid::new_v4(),
            account_id,
            task: task.to_string(),
            due_date: None,
            completed,
            created_at: Utc::now(),
        };
        self.tasks.lock().unwrap().push(row.clone());
        row
    }

    pub fn seed_employee(&self, account_id: Uuid, name: &str, role: &str) -> Employee {
        let row = Employee {
            id: Uuid::new_v4(),
            account_id,
            name: name.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        };
        self.employees.lock().unwrap().push(row.clone());
        row
    }

    /// Registra a conta de antemão, para os testes que não passam pelo resolver.
    pub fn seed_account(&self, owner: &User) -> Uuid {
        *self
            .accounts
            .lock()
            .unwrap()
            .entry(owner.id)
            .or_insert_with(Uuid::new_v4)
    }

    pub fn crops_of(&self, account_id: Uuid) -> Vec<Crop> {
        self.crops
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn crop(&self, id: Uuid) -> Option<Crop> {
        self.crops.lock().unwrap().iter().find(|c| c.id == id).cloned()
    }

    pub fn item(&self, id: Uuid) -> Option<InventoryItem> {
        self.inventory.lock().unwrap().iter().find(|i| i.id == id).cloned()
    }

    async fn before_select(&self, collection: Collection) -> Result<(), AppError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.select_latency.lock().unwrap();
        delay(latency).await;
        if *self.fail_select.lock().unwrap() == Some(collection) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn before_write(&self) -> Result<(), AppError> {
        let latency = *self.write_latency.lock().unwrap();
        delay(latency).await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl TenantBackend for FakeBackend {
    async fn ensure_personal_account(&self, user: &User) -> Result<Uuid, AppError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.ensure_latency.lock().unwrap();
        delay(latency).await;
        if self.fail_ensure.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(self.seed_account(user))
    }
}

fn build_crop(account_id: Uuid, new: &NewCrop) -> Crop {
    Crop {
        id: Uuid::new_v4(),
        account_id,
        name: new.name.trim().to_string(),
        status: new.status,
        growth: new.growth_preview(),
        created_at: Utc::now(),
    }
}

fn build_task(account_id: Uuid, new: &NewTask) -> Task {
    Task {
        id: Uuid::new_v4(),
        account_id,
        task: new.task.trim().to_string(),
        due_date: new.due_date,
        completed: false,
        created_at: Utc::now(),
    }
}

fn build_item(account_id: Uuid, new: &NewInventoryItem) -> InventoryItem {
    InventoryItem {
        id: Uuid::new_v4(),
        account_id,
        item: new.item.trim().to_string(),
        qty: new.qty,
        created_at: Utc::now(),
    }
}

fn build_employee(account_id: Uuid, new: &NewEmployee) -> Employee {
    Employee {
        id: Uuid::new_v4(),
        account_id,
        name: new.name.trim().to_string(),
        role: new.role.trim().to_string(),
        created_at: Utc::now(),
    }
}

macro_rules! fake_record_store {
    ($ty:ty, $field:ident, $build:ident) => {
        #[async_trait]
        impl RecordStore<$ty> for FakeBackend {
            async fn select(&self, account_id: Uuid) -> Result<Vec<$ty>, AppError> {
                self.before_select(<$ty as Record>::COLLECTION).await?;
                Ok(self
                    .$field
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|r| r.account_id == account_id)
                    .cloned()
                    .collect())
            }

            async fn insert(
                &self,
                account_id: Uuid,
                new: &<$ty as Record>::New,
            ) -> Result<$ty, AppError> {
                self.before_write().await?;
                let row = $build(account_id, new);
                self.$field.lock().unwrap().push(row.clone());
                Ok(row)
            }

            async fn update(
                &self,
                account_id: Uuid,
                id: Uuid,
                patch: &<$ty as Record>::Patch,
            ) -> Result<(), AppError> {
                self.before_write().await?;
                let mut rows = self.$field.lock().unwrap();
                let row = rows
                    .iter_mut()
                    .find(|r| r.id == id && r.account_id == account_id)
                    .ok_or(AppError::RecordNotFound {
                        collection: <$ty as Record>::COLLECTION,
                        id,
                    })?;
                patch.apply(row);
                Ok(())
            }

            async fn delete(&self, account_id: Uuid, id: Uuid) -> Result<(), AppError> {
                self.before_write().await?;
                let mut rows = self.$field.lock().unwrap();
                let before = rows.len();
                rows.retain(|r| !(r.id == id && r.account_id == account_id));
                if rows.len() == before {
                    return Err(AppError::RecordNotFound {
                        collection: <$ty as Record>::COLLECTION,
                        id,
                    });
                }
                Ok(())
            }
        }
    };
}

fake_record_store!(Crop, crops, build_crop);
fake_record_store!(Task, tasks, build_task);
fake_record_store!(InventoryItem, inventory, build_item);
fake_record_store!(Employee, employees, build_employee);

pub fn backends(gateway: &Arc<FakeGateway>, backend: &Arc<FakeBackend>) -> Backends {
    Backends::new(gateway.clone(), backend.clone())
}

/// Roda `f` com um limite de tempo generoso.
pub async fn within<F: Future>(f: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("operação não terminou a tempo")
}
