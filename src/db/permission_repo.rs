// src/db/permission_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::common::error::AppError;
use crate::models::permissions::{CapabilitySet, PermissionRow};
use crate::models::screens::ScreenKey;

/// Repositório de `permissoes_usuario`. Uma linha presente determina o
/// conjunto inteiro de capacidades daquela (usuário, tela); a ausência da
/// linha é igualmente significativa e é decidida pelo resolvedor.
#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Linhas persistidas do usuário (apenas as existentes; o serviço
    /// materializa o mapa total sobre o catálogo).
    pub async fn rows_for_actor(&self, usuario_id: i64) -> Result<Vec<PermissionRow>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT usuario_id, tela, pode_visualizar, pode_criar, pode_editar, pode_excluir
            FROM permissoes_usuario
            WHERE usuario_id = $1
            ORDER BY tela
            "#,
        )
        .bind(usuario_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Leitura O(1) de uma linha para o resolvedor.
    pub async fn find_row(
        &self,
        usuario_id: i64,
        tela: ScreenKey,
    ) -> Result<Option<PermissionRow>, AppError> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT usuario_id, tela, pode_visualizar, pode_criar, pode_editar, pode_excluir
            FROM permissoes_usuario
            WHERE usuario_id = $1 AND tela = $2
            "#,
        )
        .bind(usuario_id)
        .bind(tela)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Substituição transacional: DELETE + INSERT, tudo ou nada. Linhas
    /// totalmente zeradas não são persistidas.
    pub async fn replace_for_actor(
        &self,
        usuario_id: i64,
        rows: &[(ScreenKey, CapabilitySet)],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        self.replace_in_tx(&mut tx, usuario_id, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Variante que participa de uma transação maior (troca de tier +
    /// reseed em um único commit).
    pub async fn replace_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        usuario_id: i64,
        rows: &[(ScreenKey, CapabilitySet)],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM permissoes_usuario WHERE usuario_id = $1")
            .bind(usuario_id)
            .execute(&mut **tx)
            .await?;

        let persistable: Vec<_> = rows.iter().filter(|(_, set)| !set.is_empty()).collect();
        if persistable.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO permissoes_usuario \
             (usuario_id, tela, pode_visualizar, pode_criar, pode_editar, pode_excluir) ",
        );
        builder.push_values(persistable, |mut b, (tela, set)| {
            b.push_bind(usuario_id)
                .push_bind(*tela)
                .push_bind(set.visualizar)
                .push_bind(set.criar)
                .push_bind(set.editar)
                .push_bind(set.excluir);
        });
        builder.build().execute(&mut **tx).await?;

        Ok(())
    }
}
