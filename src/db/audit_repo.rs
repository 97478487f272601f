// src/db/audit_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::common::error::AppError;
use crate::models::audit::{
    AcaoCount, AuditEntry, AuditFilters, DiaCount, NewAuditEntry, RecursoCount, StatsResumo,
};

/// Repositório da trilha `auditoria_acoes`. Append-only: só existem INSERT
/// e leituras; o timestamp é atribuído pelo banco.
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &NewAuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO auditoria_acoes (usuario_id, acao, recurso, detalhes, ip_address, timestamp)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(entry.usuario_id)
        .bind(entry.acao)
        .bind(&entry.recurso)
        .bind(&entry.detalhes)
        .bind(&entry.ip)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filters: &'a AuditFilters) {
        if let Some(data_inicio) = filters.data_inicio {
            builder.push(" AND a.timestamp::date >= ").push_bind(data_inicio);
        }
        if let Some(data_fim) = filters.data_fim {
            builder.push(" AND a.timestamp::date <= ").push_bind(data_fim);
        }
        if let Some(acao) = filters.acao {
            builder.push(" AND a.acao = ").push_bind(acao);
        }
        if let Some(recurso) = &filters.recurso {
            builder.push(" AND a.recurso = ").push_bind(recurso);
        }
        if let Some(usuario_id) = filters.usuario_id {
            builder.push(" AND a.usuario_id = ").push_bind(usuario_id);
        }
    }

    /// Entradas filtradas, mais recentes primeiro, com o JOIN em `usuarios`
    /// que o frontend exibe.
    pub async fn list(
        &self,
        filters: &AuditFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                a.id, a.usuario_id,
                u.nome AS usuario_nome, u.email AS usuario_email,
                a.acao, a.recurso, a.detalhes, a.ip_address, a.timestamp
            FROM auditoria_acoes a
            LEFT JOIN usuarios u ON a.usuario_id = u.id
            WHERE 1=1
            "#,
        );
        Self::push_filters(&mut builder, filters);
        builder.push(" ORDER BY a.timestamp DESC LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let entries = builder.build_query_as::<AuditEntry>().fetch_all(&self.pool).await?;
        Ok(entries)
    }

    pub async fn count(&self, filters: &AuditFilters) -> Result<i64, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM auditoria_acoes a WHERE 1=1");
        Self::push_filters(&mut builder, filters);

        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    pub async fn count_by_acao(&self, dias: i64) -> Result<Vec<AcaoCount>, AppError> {
        let counts = sqlx::query_as::<_, AcaoCount>(
            r#"
            SELECT acao, COUNT(*) AS total
            FROM auditoria_acoes
            WHERE timestamp >= NOW() - ($1 * INTERVAL '1 day')
            GROUP BY acao
            ORDER BY total DESC
            "#,
        )
        .bind(dias)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    pub async fn count_by_recurso(&self, dias: i64) -> Result<Vec<RecursoCount>, AppError> {
        let counts = sqlx::query_as::<_, RecursoCount>(
            r#"
            SELECT recurso, COUNT(*) AS total
            FROM auditoria_acoes
            WHERE timestamp >= NOW() - ($1 * INTERVAL '1 day')
            GROUP BY recurso
            ORDER BY total DESC
            "#,
        )
        .bind(dias)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Histograma diário dos últimos 30 dias.
    pub async fn daily_histogram(&self) -> Result<Vec<DiaCount>, AppError> {
        let counts = sqlx::query_as::<_, DiaCount>(
            r#"
            SELECT timestamp::date AS dia, COUNT(*) AS total
            FROM auditoria_acoes
            WHERE timestamp >= NOW() - INTERVAL '30 days'
            GROUP BY dia
            ORDER BY dia
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    pub async fn resumo(&self) -> Result<StatsResumo, AppError> {
        let acoes_hoje: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM auditoria_acoes WHERE timestamp::date = CURRENT_DATE",
        )
        .fetch_one(&self.pool)
        .await?;

        let acoes_ultima_semana: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM auditoria_acoes WHERE timestamp >= NOW() - INTERVAL '7 days'",
        )
        .fetch_one(&self.pool)
        .await?;

        let acoes_ultimo_mes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM auditoria_acoes WHERE timestamp >= NOW() - INTERVAL '30 days'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StatsResumo { acoes_hoje, acoes_ultima_semana, acoes_ultimo_mes })
    }

    /// Pré-imagem de um recurso auditável como JSON, para o diff de update.
    /// `table` vem do registro estático de bindings, nunca de entrada do
    /// usuário.
    pub async fn load_pre_image(
        &self,
        table: &'static str,
        id: i64,
    ) -> Result<Option<serde_json::Value>, AppError> {
        let sql = format!("SELECT row_to_json(t) FROM {table} t WHERE id = $1");
        let image = sqlx::query_scalar::<_, serde_json::Value>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(image)
    }
}
