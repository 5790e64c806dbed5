// src/common/error.rs

use thiserror::Error;
use uuid::Uuid;

use crate::models::Collection;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido ou expirado")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    // Nenhuma conta (tenant) confirmada para a sessão atual
    #[error("Conta não resolvida")]
    AccountNotResolved,

    #[error("Registro {id} não encontrado em '{collection}'")]
    RecordNotFound { collection: Collection, id: Uuid },

    // A linha já tem uma exclusão em andamento
    #[error("Registro {0} ocupado")]
    RowBusy(Uuid),

    #[error("Exclusão não confirmada")]
    DeleteNotConfirmed,

    #[error("Tempo esgotado: {0}")]
    Timeout(&'static str),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Armazenamento local dos tokens (o "localStorage")
    #[error("Erro de armazenamento local: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("Erro de JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// O gateway rejeitou o token: a sessão local deve ser descartada.
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, AppError::InvalidToken | AppError::UserNotFound)
    }

    /// Falhas "duras" (rede, timeout, banco indisponível).
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Timeout(_) => true,
            AppError::DatabaseError(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::Protocol(_)
            ),
            AppError::StorageError(_) => true,
            _ => false,
        }
    }

    /// Mensagem curta exibida ao usuário (erros de carga e de mutação).
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(errors) => {
                let mut messages: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, field_errors)| {
                        field_errors.iter().map(move |e| match &e.message {
                            Some(m) => m.to_string(),
                            None => format!("Campo '{}' inválido.", field),
                        })
                    })
                    .collect();
                messages.sort();
                if messages.is_empty() {
                    "Um ou mais campos são inválidos.".to_string()
                } else {
                    messages.join(" ")
                }
            }
            AppError::EmailAlreadyExists => "Este e-mail já está em uso.".to_string(),
            AppError::InvalidCredentials => "E-mail ou senha inválidos.".to_string(),
            AppError::InvalidToken => "Sessão inválida ou expirada.".to_string(),
            AppError::UserNotFound => "Usuário não encontrado.".to_string(),
            AppError::AccountNotResolved => "Nenhuma conta carregada para esta sessão.".to_string(),
            AppError::RecordNotFound { collection, .. } => {
                format!("Registro não encontrado em {}.", collection)
            }
            AppError::RowBusy(_) => "Este registro já está sendo excluído.".to_string(),
            AppError::DeleteNotConfirmed => "A exclusão precisa ser confirmada.".to_string(),
            AppError::Timeout(_) => "O servidor demorou demais para responder.".to_string(),

            // Todos os outros erros viram uma mensagem genérica.
            // O `tracing` registra a mensagem detalhada.
            ref e => {
                tracing::error!("Erro interno: {}", e);
                "Ocorreu um erro inesperado.".to_string()
            }
        }
    }
}
