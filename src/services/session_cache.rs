// src/services/session_cache.rs

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Session, User},
};

// Prefixo reconhecível das entradas de auth (herdado do cliente web)
pub const AUTH_KEY_PREFIX: &str = "sb-";
const AUTH_KEY_MARKER: &str = "auth-token";

/// Uma entrada de auth: começa com `sb-` e contém `auth-token`.
pub fn is_auth_key(key: &str) -> bool {
    key.starts_with(AUTH_KEY_PREFIX) && key.contains(AUTH_KEY_MARKER)
}

// ---
// Armazenamento local (o equivalente ao localStorage)
// ---
/// Chave/valor em disco: cada chave é um arquivo no diretório.
/// Escritas passam por um arquivo temporário + rename, então um leitor
/// concorrente vê o blob antigo ou o novo, nunca um pedaço.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("chave inválida: {key:?}"),
            ));
        }
        Ok(self.dir.join(key))
    }

    /// Todas as chaves, em ordem. Arquivos temporários (ocultos) ficam de fora.
    pub fn keys(&self) -> io::Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    keys.push(name.to_owned());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let target = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }

    /// Remover uma chave inexistente não é erro.
    pub fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// ---
// Formato do blob persistido
// ---
#[derive(Debug, Serialize, Deserialize)]
struct CachedSessionBlob {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    expires_at: i64,
    #[serde(default)]
    user: Option<User>,
}

enum BlobCheck {
    Fresh(Session),
    Expired,
    NoIdentity,
    Malformed(serde_json::Error),
}

fn check_blob(raw: &str, now: DateTime<Utc>) -> BlobCheck {
    let blob: CachedSessionBlob = match serde_json::from_str(raw) {
        Ok(blob) => blob,
        Err(e) => return BlobCheck::Malformed(e),
    };
    let Some(user) = blob.user else {
        return BlobCheck::NoIdentity;
    };
    let session = Session {
        user,
        expires_at: blob.expires_at,
        access_token: blob.access_token,
        refresh_token: blob.refresh_token,
    };
    if session.is_expired_at(now) {
        return BlobCheck::Expired;
    }
    BlobCheck::Fresh(session)
}

/// Leitura síncrona da sessão em cache. Nunca falha: qualquer anomalia é "ausente".
pub fn read_cached_session(store: &SessionStore) -> Option<Session> {
    read_cached_session_at(store, Utc::now())
}

pub fn read_cached_session_at(store: &SessionStore, now: DateTime<Utc>) -> Option<Session> {
    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!("[Cache] Falha ao listar o armazenamento local: {}", e);
            return None;
        }
    };

    for key in keys.iter().filter(|k| is_auth_key(k)) {
        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => continue, // removida entre o keys() e o get()
            Err(e) => {
                tracing::warn!("[Cache] Falha ao ler '{}': {}", key, e);
                continue;
            }
        };
        match check_blob(&raw, now) {
            BlobCheck::Fresh(session) => {
                tracing::debug!("[Cache] Sessão local encontrada para {}", session.user.email);
                return Some(session);
            }
            BlobCheck::Expired => tracing::debug!("[Cache] Sessão expirada em '{}'", key),
            BlobCheck::NoIdentity => tracing::debug!("[Cache] Entrada sem usuário em '{}'", key),
            BlobCheck::Malformed(e) => {
                tracing::warn!("[Cache] Entrada corrompida em '{}': {}", key, e)
            }
        }
    }
    None
}

/// Remove entradas expiradas, corrompidas ou sem identidade. Retorna quantas saíram.
pub fn cleanup_expired_sessions(store: &SessionStore, now: DateTime<Utc>) -> usize {
    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!("[Cleanup] Falhou: {}", e);
            return 0;
        }
    };

    let mut removed = 0;
    for key in keys.iter().filter(|k| is_auth_key(k)) {
        let reason = match store.get(key) {
            Ok(Some(raw)) => match check_blob(&raw, now) {
                BlobCheck::Fresh(_) => continue,
                BlobCheck::Expired => "expirada",
                BlobCheck::NoIdentity => "sem usuário",
                BlobCheck::Malformed(_) => "corrompida",
            },
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("[Cleanup] Falha ao ler '{}': {}", key, e);
                continue;
            }
        };
        match store.remove(key) {
            Ok(()) => {
                tracing::info!("[Cleanup] Removendo sessão {}: {}", reason, key);
                removed += 1;
            }
            Err(e) => tracing::warn!("[Cleanup] Falha ao remover '{}': {}", key, e),
        }
    }
    removed
}

/// Limpeza manual: apaga toda chave `sb-`. Usado quando o logout remoto falha.
pub fn purge_auth_entries(store: &SessionStore) -> usize {
    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!("[Purge] Falhou: {}", e);
            return 0;
        }
    };

    let mut removed = 0;
    for key in keys.iter().filter(|k| k.starts_with(AUTH_KEY_PREFIX)) {
        match store.remove(key) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("[Purge] Falha ao remover '{}': {}", key, e),
        }
    }
    removed
}

/// Grava a sessão sob `key` (efeito colateral do login/refresh).
pub fn persist_session(store: &SessionStore, key: &str, session: &Session) -> Result<(), AppError> {
    let blob = CachedSessionBlob {
        access_token: session.access_token.clone(),
        refresh_token: session.refresh_token.clone(),
        expires_at: session.expires_at,
        user: Some(session.user.clone()),
    };
    store.set(key, &serde_json::to_string(&blob)?)?;
    Ok(())
}

/// Leitura estrita para o gateway: erros de formato são propagados.
pub fn load_session(store: &SessionStore, key: &str) -> Result<Option<Session>, AppError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let blob: CachedSessionBlob = serde_json::from_str(&raw)?;
    Ok(blob.user.map(|user| Session {
        user,
        expires_at: blob.expires_at,
        access_token: blob.access_token,
        refresh_token: blob.refresh_token,
    }))
}
