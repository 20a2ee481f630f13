use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::models::subscription::SubscriptionStatus;

// Nosso tipo de erro central, com `thiserror` para melhor ergonomia.
// Cada variante carrega um código estável que o cliente usa para decidir
// o que renderizar (tela de renovação, contexto em falta, etc).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    // A rota exige um restaurante ativo e o token/cabeçalho não trouxe nenhum.
    // Distinto de AccessRevoked de propósito: o cliente reage de formas diferentes.
    #[error("Nenhum contexto de restaurante na requisição")]
    NoContext,

    // Existe contexto, mas o vínculo do usuário com o restaurante não existe
    // ou foi desativado.
    #[error("Acesso ao restaurante revogado")]
    AccessRevoked,

    #[error("Permissão insuficiente: {0}")]
    Forbidden(String),

    #[error("Usuário já possui um papel neste restaurante")]
    MembershipAlreadyExists,

    #[error("Já existe um papel com esse nome")]
    RoleNameAlreadyExists,

    #[error("Papéis de sistema não podem ser alterados ou removidos")]
    SystemRoleImmutable,

    #[error("Papel ainda está em uso por membros do restaurante")]
    RoleInUse,

    // Revisão repetida de uma transação já aprovada/rejeitada.
    #[error("Transação já foi processada")]
    AlreadyProcessed,

    // Corrida perdida num compare-and-swap de assinatura.
    #[error("Conflito de atualização concorrente")]
    Conflict,

    // Assinatura inválida barrando o acesso a funcionalidades. Carrega o
    // suficiente para o cliente montar uma mensagem acionável.
    #[error("Assinatura bloqueada ({status:?})")]
    SubscriptionBlocked {
        status: SubscriptionStatus,
        current_period_end: DateTime<Utc>,
        grace_end_date: Option<DateTime<Utc>>,
        days_expired: i64,
    },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "code": "VALIDATION",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::SubscriptionBlocked {
                status,
                current_period_end,
                grace_end_date,
                days_expired,
            } => {
                // 402: assinatura em dia é a condição de pagamento da plataforma.
                let body = Json(json!({
                    "error": "Assinatura suspensa ou expirada. Renove para continuar.",
                    "code": "SUBSCRIPTION_BLOCKED",
                    "blocked": true,
                    "status": status,
                    "currentPeriodEnd": current_period_end,
                    "graceEndDate": grace_end_date,
                    "daysExpired": days_expired,
                    "requiresAction": true,
                }));
                return (StatusCode::PAYMENT_REQUIRED, body).into_response();
            }
            AppError::InvalidInput(msg) => {
                let body = Json(json!({ "error": msg, "code": "VALIDATION" }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Forbidden(msg) => {
                let body = Json(json!({ "error": msg, "code": "FORBIDDEN" }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            AppError::NotFound(what) => {
                let body = Json(json!({
                    "error": format!("{} não encontrado.", what),
                    "code": "NOT_FOUND",
                }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            AppError::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "EMAIL_EXISTS",
                "Este e-mail já está em uso.",
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "E-mail ou senha inválidos.",
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Token de autenticação inválido ou ausente.",
            ),
            AppError::NoContext => (
                StatusCode::BAD_REQUEST,
                "NO_CONTEXT",
                "O cabeçalho X-Restaurant-Id é obrigatório para esta operação.",
            ),
            AppError::AccessRevoked => (
                StatusCode::FORBIDDEN,
                "ACCESS_REVOKED",
                "Seu acesso a este restaurante não existe ou foi desativado.",
            ),
            AppError::MembershipAlreadyExists => (
                StatusCode::CONFLICT,
                "MEMBERSHIP_EXISTS",
                "O usuário já possui um papel neste restaurante.",
            ),
            AppError::RoleNameAlreadyExists => (
                StatusCode::CONFLICT,
                "ROLE_EXISTS",
                "Já existe um papel com esse nome.",
            ),
            AppError::SystemRoleImmutable => (
                StatusCode::FORBIDDEN,
                "SYSTEM_ROLE",
                "Papéis de sistema não podem ser alterados ou removidos.",
            ),
            AppError::RoleInUse => (
                StatusCode::CONFLICT,
                "ROLE_IN_USE",
                "Não é possível remover um papel atribuído a membros.",
            ),
            AppError::AlreadyProcessed => (
                StatusCode::CONFLICT,
                "ALREADY_PROCESSED",
                "Esta transação já foi aprovada ou rejeitada.",
            ),
            AppError::Conflict => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "O registro foi alterado por outra operação. Tente novamente.",
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "Ocorreu um erro inesperado.",
                )
            }
        };

        let body = Json(json!({ "error": error_message, "code": code }));
        (status, body).into_response()
    }
}
