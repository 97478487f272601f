// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::common::error::AppError;
use crate::models::auth::{NivelAcesso, StatusUsuario, TipoAcesso, Usuario};
use crate::models::permissions::UsuarioResumo;

const USUARIO_COLS: &str =
    "id, nome, email, senha_hash, tipo_de_acesso, nivel_de_acesso, status, criado_em, atualizado_em";

// O repositório de usuários. O resolvedor de permissões carrega o usuário a
// cada requisição por aqui; nada é cacheado.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Usuario>, AppError> {
        let sql = format!("SELECT {USUARIO_COLS} FROM usuarios WHERE email = $1");
        let maybe_user = sqlx::query_as::<_, Usuario>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Usuario>, AppError> {
        let sql = format!("SELECT {USUARIO_COLS} FROM usuarios WHERE id = $1");
        let maybe_user = sqlx::query_as::<_, Usuario>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    /// Resumo usado nas respostas de permissão (sem hash de senha).
    pub async fn find_resumo(&self, id: i64) -> Result<Option<UsuarioResumo>, AppError> {
        let resumo = sqlx::query_as::<_, UsuarioResumo>(
            "SELECT id, nome, email, tipo_de_acesso, nivel_de_acesso FROM usuarios WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(resumo)
    }

    /// Transição administrativa de status (ativo <-> inativo, bloqueado -> ativo)
    /// e também o bloqueio automático por excesso de tentativas.
    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: i64,
        status: StatusUsuario,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE usuarios SET status = $1, atualizado_em = NOW() WHERE id = $2",
        )
        .bind(status)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Troca de tier. Roda dentro da mesma transação que o reseed das
    /// permissões, para que nenhuma leitura concorrente veja um estado meio
    /// aplicado.
    pub async fn update_acesso<'e, E>(
        &self,
        executor: E,
        id: i64,
        tipo: TipoAcesso,
        nivel: NivelAcesso,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE usuarios SET tipo_de_acesso = $1, nivel_de_acesso = $2, atualizado_em = NOW() WHERE id = $3",
        )
        .bind(tipo)
        .bind(nivel)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
