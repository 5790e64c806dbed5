// src/services/auth.rs

use async_trait::async_trait;
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sqlx::PgPool;
use tokio::sync::broadcast;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{AuthChange, AuthEvent, Claims, Session, SignInPayload, SignUpPayload, User},
    services::{
        events::AuthEvents,
        gateway::AuthGateway,
        session_cache::{SessionStore, load_session, persist_session, purge_auth_entries},
    },
};

/// Parâmetros dos tokens emitidos pelo gateway.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub refresh_margin: Duration,
}

/// Gateway de auth sobre a tabela 'users': senha com bcrypt, sessão em JWT,
/// persistida no armazenamento local sob `storage_key`.
#[derive(Clone)]
pub struct PgAuthGateway {
    user_repo: UserRepository,
    pool: PgPool,
    store: SessionStore,
    storage_key: String,
    tokens: TokenSettings,
    events: AuthEvents,
}

impl PgAuthGateway {
    pub fn new(
        user_repo: UserRepository,
        pool: PgPool,
        store: SessionStore,
        storage_key: String,
        tokens: TokenSettings,
    ) -> Self {
        Self {
            user_repo,
            pool,
            store,
            storage_key,
            tokens,
            events: AuthEvents::default(),
        }
    }

    fn issue(&self, user: User) -> Result<Session, AppError> {
        issue_session(&self.tokens, user, Utc::now())
    }

    fn needs_refresh(&self, claims: &Claims, now: DateTime<Utc>) -> bool {
        (claims.exp as i64) - now.timestamp() <= self.tokens.refresh_margin.num_seconds()
    }
}

/// Emite um JWT (HS256) e monta a sessão correspondente.
pub fn issue_session(tokens: &TokenSettings, user: User, now: DateTime<Utc>) -> Result<Session, AppError> {
    let expires_at = now + tokens.session_ttl;

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let access_token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(tokens.jwt_secret.as_ref()),
    )?;

    Ok(Session {
        user,
        expires_at: expires_at.timestamp(),
        access_token,
        refresh_token: None,
    })
}

/// Troca o usuário da sessão persistida pelo do banco. `true` se algo mudou.
pub fn reconcile_user(stored: Session, user: User) -> (Session, bool) {
    let changed = stored.user != user;
    (Session { user, ..stored }, changed)
}

/// Valida assinatura e expiração (sem tolerância).
pub fn decode_token(jwt_secret: &str, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &validation,
    )
    .map_err(|_| AppError::InvalidToken)?;
    Ok(token_data.claims)
}

#[async_trait]
impl AuthGateway for PgAuthGateway {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        let stored = match load_session(&self.store, &self.storage_key) {
            Ok(stored) => stored,
            Err(AppError::JsonError(e)) => {
                tracing::warn!("[Auth] Sessão persistida corrompida, descartando: {}", e);
                self.store.remove(&self.storage_key)?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let Some(stored) = stored else {
            return Ok(None);
        };

        let claims = decode_token(&self.tokens.jwt_secret, &stored.access_token)?;
        let now = Utc::now();
        let needs_refresh = self.needs_refresh(&claims, now);

        let user: User = match self.user_repo.find_by_id(claims.sub).await? {
            Some(record) => record.into(),
            None => {
                if needs_refresh {
                    self.events.publish(AuthChange::new(AuthEvent::TokenRefreshFailed, None));
                }
                return Err(AppError::UserNotFound);
            }
        };

        if !needs_refresh {
            let (session, changed) = reconcile_user(stored, user);
            if changed {
                // Identidade mudou no banco (ex.: e-mail trocado)
                persist_session(&self.store, &self.storage_key, &session)?;
                tracing::info!("👤 Usuário atualizado: {}", session.user.email);
                self.events.publish(AuthChange::new(AuthEvent::UserUpdated, Some(session.clone())));
            }
            return Ok(Some(session));
        }

        // Perto de expirar: renova e avisa os assinantes
        let refreshed = match self.issue(user) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("[Auth] Falha ao renovar o token: {}", e);
                self.events.publish(AuthChange::new(AuthEvent::TokenRefreshFailed, None));
                return Err(AppError::InvalidToken);
            }
        };
        persist_session(&self.store, &self.storage_key, &refreshed)?;
        tracing::info!("🔄 Token renovado para {}", refreshed.user.email);
        self.events.publish(AuthChange::new(AuthEvent::TokenRefreshed, Some(refreshed.clone())));
        Ok(Some(refreshed))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let payload = SignInPayload {
            email: email.trim().to_owned(),
            password: password.to_owned(),
        };
        payload.validate()?;

        let record = self
            .user_repo
            .find_by_email(&payload.email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_hash = record.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&payload.password, &password_hash)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let session = self.issue(record.into())?;
        persist_session(&self.store, &self.storage_key, &session)?;

        tracing::info!("🔑 Login de {}", session.user.email);
        self.events.publish(AuthChange::new(AuthEvent::SignedIn, Some(session.clone())));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, AppError> {
        let payload = SignUpPayload {
            email: email.trim().to_owned(),
            password: password.to_owned(),
        };
        payload.validate()?;

        // Hashing fora do runtime assíncrono
        let password = payload.password.clone();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let record = self
            .user_repo
            .create_user(&self.pool, &payload.email, &hashed_password)
            .await?;

        tracing::info!("👤 Usuário registrado: {}", record.email);
        Ok(record.into())
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let removed = self.store.remove(&self.storage_key);
        if let Err(e) = &removed {
            tracing::warn!("[Auth] Falha ao remover a sessão, limpando tudo: {}", e);
            purge_auth_entries(&self.store);
        }

        // SIGNED_OUT sai mesmo que a remoção tenha falhado
        self.events.publish(AuthChange::new(AuthEvent::SignedOut, None));
        Ok(removed?)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}
