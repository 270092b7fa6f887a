// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;

use serde_json::{json, Value};
use validator::{ValidationErrors, ValidationErrorsKind};
use thiserror::Error;

use crate::common::notification::Notification;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Sessão não encontrada ou encerrada")]
    SessionNotFound,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Membro não encontrado")]
    MemberNotFound,

    #[error("Pequeno grupo não encontrado")]
    SmallGroupNotFound,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Erro já traduzido para a resposta HTTP, carregando as notificações
/// emitidas durante a requisição.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
    pub notifications: Vec<Notification>,
}

impl ApiError {
    pub fn with_notifications(mut self, notifications: Vec<Notification>) -> Self {
        self.notifications = notifications;
        self
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::SessionNotFound => {
                StatusCode::UNAUTHORIZED
            }
            AppError::UserNotFound | AppError::MemberNotFound | AppError::SmallGroupNotFound => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        let status = self.status();

        // Retorna todos os detalhes da validação, campo a campo.
        if let AppError::ValidationError(errors) = self {
            let mut details = BTreeMap::new();
            collect_validation_details("", errors, &mut details);
            return ApiError {
                status,
                error: "Um ou mais campos são inválidos.".to_string(),
                details: Some(json!(details)),
                notifications: Vec::new(),
            };
        }

        let error = match self {
            AppError::EmailAlreadyExists => "Este e-mail já está em uso.",
            AppError::InvalidCredentials => "E-mail ou senha inválidos.",
            AppError::InvalidToken => "Token de autenticação inválido ou ausente.",
            AppError::SessionNotFound => "Sessão expirada. Faça login novamente.",
            AppError::UserNotFound => "Usuário não encontrado.",
            AppError::MemberNotFound => "Membro não encontrado.",
            AppError::SmallGroupNotFound => "Pequeno grupo não encontrado.",
            // Todos os outros erros viram 500; o detalhe fica só no log.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                "Ocorreu um erro inesperado."
            }
        };

        ApiError {
            status,
            error: error.to_string(),
            details: None,
            notifications: Vec::new(),
        }
    }
}

// Achata erros aninhados (`#[validate(nested)]`) em chaves como "endereco.bairro".
fn collect_validation_details(
    prefix: &str,
    errors: &ValidationErrors,
    details: &mut BTreeMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages = field_errors.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                });
                details.entry(key).or_default().extend(messages);
            }
            ValidationErrorsKind::Struct(inner) => collect_validation_details(&key, inner, details),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation_details(&format!("{}[{}]", key, index), inner, details);
                }
            }
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "notifications": self.notifications,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}
