// src/services/auth.rs

use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::audit::{AuditAction, NewAuditEntry},
    models::auth::{AuthResponse, Claims, StatusUsuario, Usuario},
    services::audit_service::AuditRecorder,
    services::login_limiter::LoginRateLimiter,
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    limiter: Arc<dyn LoginRateLimiter>,
    recorder: AuditRecorder,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        limiter: Arc<dyn LoginRateLimiter>,
        recorder: AuditRecorder,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, limiter, recorder, jwt_secret, pool }
    }

    pub async fn login(
        &self,
        email: &str,
        senha: &str,
        ip: Option<String>,
    ) -> Result<AuthResponse, AppError> {
        // O contador em memória corta cedo, antes de tocar no banco.
        if self.limiter.is_blocked(email).await {
            return Err(AppError::AccountBlocked);
        }

        let Some(usuario) = self.user_repo.find_by_email(email).await? else {
            self.register_failure(email, None).await;
            return Err(AppError::InvalidCredentials);
        };

        // Status persistido decide antes da senha: bloqueado só volta com
        // reset manual de administrador, mesmo com a senha correta.
        match usuario.status {
            StatusUsuario::Bloqueado => return Err(AppError::AccountBlocked),
            StatusUsuario::Inativo => return Err(AppError::AccountInactive),
            StatusUsuario::Ativo => {}
        }

        let senha_clone = senha.to_owned();
        let hash_clone = usuario.senha_hash.clone();
        let senha_valida = tokio::task::spawn_blocking(move || verify(&senha_clone, &hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !senha_valida {
            self.register_failure(email, Some(&usuario)).await;
            return Err(AppError::InvalidCredentials);
        }

        self.limiter.record_success(email).await;

        let token = self.create_token(usuario.id)?;
        self.recorder.record(NewAuditEntry {
            usuario_id: Some(usuario.id),
            acao: AuditAction::Login,
            recurso: "auth".into(),
            detalhes: None,
            ip,
        });

        Ok(AuthResponse { token, usuario })
    }

    /// Registra a falha no limiter e, se ela estourou o limite, persiste o
    /// bloqueio da conta. A partir daí o login curto-circuita no status.
    async fn register_failure(&self, email: &str, usuario: Option<&Usuario>) {
        let outcome = self.limiter.record_failure(email).await;
        if !outcome.blocked {
            return;
        }
        let Some(usuario) = usuario else { return };

        match self.user_repo.set_status(&self.pool, usuario.id, StatusUsuario::Bloqueado).await {
            Ok(_) => {
                tracing::warn!(
                    "Usuário {} bloqueado após {} tentativas de login.",
                    usuario.id,
                    outcome.attempts
                );
                self.recorder.record(NewAuditEntry {
                    usuario_id: Some(usuario.id),
                    acao: AuditAction::UserStatusChange,
                    recurso: "usuarios".into(),
                    detalhes: Some(json!({
                        "motivo": "tentativas de login excedidas",
                        "changes": {
                            "status": { "from": usuario.status, "to": StatusUsuario::Bloqueado }
                        }
                    })),
                    ip: None,
                });
            }
            Err(e) => tracing::error!("Falha ao persistir bloqueio do usuário {}: {}", usuario.id, e),
        }
    }

    /// Reset manual de administrador: além do status `ativo` persistido, o
    /// contador em memória do e-mail é zerado para o login voltar na hora.
    pub async fn clear_login_block(&self, email: &str) {
        self.limiter.record_success(email).await;
    }

    pub fn logout(&self, usuario: &Usuario, ip: Option<String>) {
        self.recorder.record(NewAuditEntry {
            usuario_id: Some(usuario.id),
            acao: AuditAction::Logout,
            recurso: "auth".into(),
            detalhes: None,
            ip,
        });
    }

    /// Valida o token e carrega o usuário fresco do banco: mudança de
    /// status vale na requisição seguinte, sem cache.
    pub async fn validate_token(&self, token: &str) -> Result<Usuario, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        let usuario = self
            .user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuário não encontrado".into()))?;

        match usuario.status {
            StatusUsuario::Bloqueado => Err(AppError::AccountBlocked),
            StatusUsuario::Inativo => Err(AppError::AccountInactive),
            StatusUsuario::Ativo => Ok(usuario),
        }
    }

    fn create_token(&self, usuario_id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: usuario_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
