use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Taxonomia de erros da aplicação. Falhas de auditoria nunca aparecem aqui:
// são engolidas pelo gravador e registradas apenas no log operacional.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Validation(String),

    #[error("Tela desconhecida: {0}")]
    UnknownScreen(String),

    // Mensagem fixa: não vazamos o estado real de permissões nem a
    // existência do recurso.
    #[error("Permissão insuficiente")]
    PermissionDenied,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário inativo")]
    AccountInactive,

    #[error("Usuário bloqueado")]
    AccountBlocked,

    #[error("{0}")]
    NotFound(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    // Variante genérica para qualquer outro erro inesperado.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
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
                    "details": details,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::Validation(msg) => {
                let body = Json(json!({ "error": msg }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::UnknownScreen(tela) => {
                let body = Json(json!({ "error": format!("Tela desconhecida: {}", tela) }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "Permissão insuficiente"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos."),
            AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Token de autenticação inválido ou ausente.")
            }
            AppError::AccountInactive => {
                (StatusCode::UNAUTHORIZED, "Usuário inativo. Contate um administrador.")
            }
            AppError::AccountBlocked => (
                StatusCode::FORBIDDEN,
                "Usuário bloqueado por excesso de tentativas. Contate um administrador.",
            ),
            AppError::NotFound(msg) => {
                let body = Json(json!({ "error": msg }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O `tracing` loga a mensagem detalhada que o `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
