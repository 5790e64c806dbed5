// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{PgDataBackend, UserRepository},
    services::{
        auth::{PgAuthGateway, TokenSettings},
        gateway::Backends,
        session_cache::SessionStore,
    },
};

/// Limites de tempo das chamadas remotas do pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub auth_verify: Duration,
    pub account_resolve: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            auth_verify: Duration::from_millis(4000),
            account_resolve: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub session_dir: String,
    pub session_storage_key: String,
    pub timeouts: Timeouts,
    pub session_ttl_secs: i64,
    pub session_refresh_margin_secs: i64,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            session_dir: env::var("SESSION_DIR").unwrap_or_else(|_| ".session".to_string()),
            session_storage_key: env::var("SESSION_STORAGE_KEY")
                .unwrap_or_else(|_| "sb-auth-token".to_string()),
            timeouts: Timeouts {
                auth_verify: Duration::from_millis(var_or("AUTH_VERIFY_TIMEOUT_MS", 4000)?),
                account_resolve: Duration::from_millis(var_or("ACCOUNT_RESOLVE_TIMEOUT_MS", 3000)?),
            },
            session_ttl_secs: var_or("SESSION_TTL_SECS", 3600)?,
            session_refresh_margin_secs: var_or("SESSION_REFRESH_MARGIN_SECS", 60)?,
        })
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            jwt_secret: self.jwt_secret.clone(),
            session_ttl: chrono::Duration::seconds(self.session_ttl_secs),
            refresh_margin: chrono::Duration::seconds(self.session_refresh_margin_secs),
        }
    }
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub store: SessionStore,
    pub backends: Backends,
    pub timeouts: Timeouts,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let store = SessionStore::open(&settings.session_dir)
            .with_context(|| format!("Falha ao abrir o armazenamento de sessão em '{}'", settings.session_dir))?;

        // --- Monta o gráfico de dependências ---
        let auth = PgAuthGateway::new(
            UserRepository::new(db_pool.clone()),
            db_pool.clone(),
            store.clone(),
            settings.session_storage_key.clone(),
            settings.token_settings(),
        );
        let data = PgDataBackend::new(db_pool.clone());
        let backends = Backends::new(Arc::new(auth), Arc::new(data));

        Ok(Self {
            db_pool,
            store,
            backends,
            timeouts: settings.timeouts,
        })
    }
}
